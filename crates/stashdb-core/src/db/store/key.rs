use crate::{types::Timestamp, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// StorageKey
///
/// One key-encodable scalar. The derived `Ord` ranks variants first and
/// values within a variant second; partitions only ever mix kinds when a
/// schema is malformed, so the cross-kind order just needs to be total.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum StorageKey {
    Int(i64),
    Text(String),
    Timestamp(Timestamp),
}

impl StorageKey {
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Timestamp(t) => Value::Timestamp(*t),
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        if let Self::Int(i) = self {
            Some(*i)
        } else {
            None
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Timestamp(t) => write!(f, "{t}"),
        }
    }
}

///
/// KeyTuple
///
/// The ordered tuple of key-path values that identifies one record within
/// its partition. Tuple identity is stable: key-path writes are modeled as
/// delete-at-old + insert-at-new, never as in-place mutation.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct KeyTuple(Vec<StorageKey>);

impl KeyTuple {
    #[must_use]
    pub const fn new(keys: Vec<StorageKey>) -> Self {
        Self(keys)
    }

    #[must_use]
    pub fn single(key: StorageKey) -> Self {
        Self(vec![key])
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&StorageKey> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StorageKey> {
        self.0.iter()
    }

    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        self.0.iter().map(StorageKey::to_value).collect()
    }
}

impl From<Vec<StorageKey>> for KeyTuple {
    fn from(keys: Vec<StorageKey>) -> Self {
        Self(keys)
    }
}

impl fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}")?;
        }
        write!(f, ")")
    }
}
