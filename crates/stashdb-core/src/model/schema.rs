use crate::{
    error::InternalError,
    model::{
        entity::EntityModel,
        field::{FieldDefault, FieldKind},
        relation::RelationKind,
    },
};
use thiserror::Error as ThisError;

///
/// SchemaModel
/// The full set of entity models served by one database, at one version.
///

#[derive(Debug)]
pub struct SchemaModel {
    pub name: &'static str,
    /// Fixed store layout version; partition creation is idempotent per version.
    pub version: u32,
    pub entities: &'static [&'static EntityModel],
}

impl SchemaModel {
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&'static EntityModel> {
        self.entities.iter().copied().find(|e| e.name == name)
    }

    /// Validate structural invariants before any partition is created.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, entity) in self.entities.iter().enumerate() {
            if self.entities[..i].iter().any(|e| e.name == entity.name) {
                return Err(SchemaError::DuplicateEntity { entity: entity.name });
            }
            self.validate_entity(entity)?;
        }

        Ok(())
    }

    fn validate_entity(&self, entity: &EntityModel) -> Result<(), SchemaError> {
        if entity.key_path.is_empty() {
            return Err(SchemaError::EmptyKeyPath { entity: entity.name });
        }

        for key_field in entity.key_path {
            let field = entity.field(key_field).ok_or(SchemaError::UnknownKeyField {
                entity: entity.name,
                field: key_field,
            })?;
            if field.nullable || !field.kind.is_keyable() {
                return Err(SchemaError::UnkeyableField {
                    entity: entity.name,
                    field: key_field,
                });
            }
        }

        for field in entity.fields {
            let default_ok = match field.default {
                FieldDefault::None => true,
                FieldDefault::Null => field.nullable,
                FieldDefault::False => field.kind == FieldKind::Bool,
                FieldDefault::Now => field.kind == FieldKind::Timestamp,
                FieldDefault::AutoIncrement => {
                    field.kind == FieldKind::Int
                        && entity.single_key_field() == Some(field.name)
                }
            };
            if !default_ok {
                return Err(SchemaError::InvalidDefault {
                    entity: entity.name,
                    field: field.name,
                });
            }
        }

        for relation in entity.relations {
            let target = self
                .entity(relation.target)
                .ok_or(SchemaError::UnknownRelationTarget {
                    entity: entity.name,
                    relation: relation.name,
                    target: relation.target,
                })?;

            // FK cascade rewrites one field; composite key targets cannot be
            // referenced through a single foreign-key column.
            let (fk_owner, key_owner) = match relation.kind {
                RelationKind::ToOne => (entity, target),
                RelationKind::ToMany => (target, entity),
            };
            let key_field_name =
                key_owner
                    .single_key_field()
                    .ok_or(SchemaError::CompositeKeyRelationTarget {
                        entity: entity.name,
                        relation: relation.name,
                    })?;
            let key_field =
                key_owner
                    .field(key_field_name)
                    .ok_or(SchemaError::UnknownKeyField {
                        entity: key_owner.name,
                        field: key_field_name,
                    })?;

            let fk = fk_owner
                .field(relation.fk_field)
                .ok_or(SchemaError::UnknownForeignKeyField {
                    entity: entity.name,
                    relation: relation.name,
                    field: relation.fk_field,
                })?;
            if fk.kind != key_field.kind {
                return Err(SchemaError::ForeignKeyKindMismatch {
                    entity: entity.name,
                    relation: relation.name,
                    field: relation.fk_field,
                });
            }
        }

        Ok(())
    }
}

///
/// SchemaError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("duplicate entity '{entity}'")]
    DuplicateEntity { entity: &'static str },

    #[error("entity '{entity}' declares an empty key path")]
    EmptyKeyPath { entity: &'static str },

    #[error("entity '{entity}' key path names unknown field '{field}'")]
    UnknownKeyField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' key field '{field}' is nullable or non-keyable")]
    UnkeyableField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' field '{field}' declares a default its kind does not support")]
    InvalidDefault {
        entity: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' relation '{relation}' targets unknown entity '{target}'")]
    UnknownRelationTarget {
        entity: &'static str,
        relation: &'static str,
        target: &'static str,
    },

    #[error("entity '{entity}' relation '{relation}' names unknown foreign-key field '{field}'")]
    UnknownForeignKeyField {
        entity: &'static str,
        relation: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' relation '{relation}' crosses a composite key path")]
    CompositeKeyRelationTarget {
        entity: &'static str,
        relation: &'static str,
    },

    #[error("entity '{entity}' relation '{relation}' foreign key '{field}' kind mismatch")]
    ForeignKeyKindMismatch {
        entity: &'static str,
        relation: &'static str,
        field: &'static str,
    },
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::schema_unsupported(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldModel;
    use crate::model::relation::RelationModel;
    use crate::test_fixtures;

    #[test]
    fn demo_schema_validates() {
        assert_eq!(test_fixtures::SCHEMA.validate(), Ok(()));
    }

    #[test]
    fn rejects_unknown_relation_target() {
        static FIELDS: [FieldModel; 1] = [FieldModel {
            name: "id",
            kind: FieldKind::Int,
            nullable: false,
            default: FieldDefault::None,
        }];
        static RELATIONS: [RelationModel; 1] = [RelationModel {
            name: "ghost",
            target: "Nowhere",
            kind: RelationKind::ToOne,
            fk_field: "id",
            required: false,
        }];
        static ENTITY: EntityModel = EntityModel {
            name: "Orphan",
            key_path: &["id"],
            fields: &FIELDS,
            relations: &RELATIONS,
        };
        static SCHEMA: SchemaModel = SchemaModel {
            name: "broken",
            version: 1,
            entities: &[&ENTITY],
        };

        assert!(matches!(
            SCHEMA.validate(),
            Err(SchemaError::UnknownRelationTarget { .. })
        ));
    }

    #[test]
    fn rejects_nullable_key_field() {
        static FIELDS: [FieldModel; 1] = [FieldModel {
            name: "id",
            kind: FieldKind::Int,
            nullable: true,
            default: FieldDefault::Null,
        }];
        static ENTITY: EntityModel = EntityModel {
            name: "Bad",
            key_path: &["id"],
            fields: &FIELDS,
            relations: &[],
        };
        static SCHEMA: SchemaModel = SchemaModel {
            name: "broken",
            version: 1,
            entities: &[&ENTITY],
        };

        assert!(matches!(
            SCHEMA.validate(),
            Err(SchemaError::UnkeyableField { .. })
        ));
    }

    #[test]
    fn rejects_auto_increment_off_key() {
        static FIELDS: [FieldModel; 2] = [
            FieldModel {
                name: "id",
                kind: FieldKind::Int,
                nullable: false,
                default: FieldDefault::None,
            },
            FieldModel {
                name: "seq",
                kind: FieldKind::Int,
                nullable: false,
                default: FieldDefault::AutoIncrement,
            },
        ];
        static ENTITY: EntityModel = EntityModel {
            name: "Bad",
            key_path: &["id"],
            fields: &FIELDS,
            relations: &[],
        };
        static SCHEMA: SchemaModel = SchemaModel {
            name: "broken",
            version: 1,
            entities: &[&ENTITY],
        };

        assert!(matches!(
            SCHEMA.validate(),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }
}
