use crate::model::{field::FieldModel, relation::RelationModel};

///
/// EntityModel
/// Minimal runtime model for one entity; one store partition per model.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Stable entity name; doubles as the partition name.
    pub name: &'static str,
    /// Ordered primary-key field list.
    pub key_path: &'static [&'static str],
    /// Ordered field list (authoritative for validation and defaults).
    pub fields: &'static [FieldModel],
    /// Relation definitions.
    pub relations: &'static [RelationModel],
}

impl EntityModel {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationModel> {
        self.relations.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn is_key_field(&self, name: &str) -> bool {
        self.key_path.contains(&name)
    }

    /// The single key field, when the key path is not composite.
    #[must_use]
    pub const fn single_key_field(&self) -> Option<&'static str> {
        if self.key_path.len() == 1 {
            Some(self.key_path[0])
        } else {
            None
        }
    }
}
