use crate::{
    db::store::{KeyTuple, StorageKey},
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

///
/// Record
///
/// One stored row: a mapping from field name to scalar value. Identity is
/// the ordered tuple of key-path values, not the map itself.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value with absent fields read as `Null`.
    #[must_use]
    pub fn value_or_null(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Compute the identity tuple of this record under `model`.
    ///
    /// A key-path field that is missing, null, or non-keyable means the row
    /// no longer satisfies its own schema, which is store corruption.
    pub fn key_tuple(&self, model: &EntityModel) -> Result<KeyTuple, InternalError> {
        let mut keys = Vec::with_capacity(model.key_path.len());
        for field in model.key_path {
            let key = self
                .get(field)
                .and_then(Value::as_storage_key)
                .ok_or_else(|| {
                    InternalError::store_corruption(format!(
                        "record in '{}' has no keyable value for key field '{field}'",
                        model.name
                    ))
                })?;
            keys.push(key);
        }

        Ok(KeyTuple::new(keys))
    }

    /// Builder-style setter for fixtures and inline construction.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// RecordView
///
/// One output row: the projected scalar fields plus any attached relations.
/// Views are produced by read paths and never written back.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordView {
    pub fields: Record,
    pub relations: BTreeMap<String, RelationValue>,
}

impl RecordView {
    #[must_use]
    pub const fn from_record(fields: Record) -> Self {
        Self {
            fields,
            relations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub(crate) fn attach(&mut self, name: impl Into<String>, value: RelationValue) {
        self.relations.insert(name.into(), value);
    }

    /// Retain only the allow-listed scalar fields and relations.
    pub(crate) fn project(&mut self, fields: &[String], relations: &[String]) {
        let dropped: Vec<String> = self
            .fields
            .field_names()
            .into_iter()
            .filter(|name| !fields.iter().any(|f| f == name))
            .map(ToString::to_string)
            .collect();
        for name in dropped {
            self.fields.remove(&name);
        }
        self.relations.retain(|name, _| relations.iter().any(|r| r == name));
    }

    /// Extract the identity tuple from the view's scalar fields.
    pub(crate) fn key_tuple(&self, model: &EntityModel) -> Result<KeyTuple, InternalError> {
        self.fields.key_tuple(model)
    }

    /// First key slot, for single-field key paths.
    pub(crate) fn single_key(&self, model: &EntityModel) -> Result<StorageKey, InternalError> {
        let tuple = self.key_tuple(model)?;
        tuple.first().cloned().ok_or_else(|| {
            InternalError::store_corruption(format!("empty key tuple for '{}'", model.name))
        })
    }
}

///
/// RelationValue
/// Attached relation content on an output row.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RelationValue {
    One(Option<Box<RecordView>>),
    Many(Vec<RecordView>),
}

impl RelationValue {
    #[must_use]
    pub const fn as_one(&self) -> Option<&RecordView> {
        match self {
            Self::One(Some(view)) => Some(view),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_many(&self) -> Option<&[RecordView]> {
        match self {
            Self::Many(views) => Some(views.as_slice()),
            Self::One(_) => None,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::One(None))
    }
}
