mod compare;

#[cfg(test)]
mod tests;

use crate::{db::store::StorageKey, types::Timestamp};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, cmp::Ordering};

///
/// TextMode
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TextMode {
    /// case-sensitive
    #[default]
    Cs,
    /// case-insensitive
    Ci,
}

///
/// Value
/// can be used in filter clauses and as record field content
///
/// Null → the field's value is absent (i.e., SQL NULL).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
    Bool(bool),
    Int(i64),
    Null,
    Text(String),
    Timestamp(Timestamp),
}

impl Value {
    ///
    /// TYPES
    ///

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Stable label for diagnostics and error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    ///
    /// CONVERSION
    ///

    /// NOTE:
    /// Only key-encodable variants project into a [`StorageKey`];
    /// `Null`, `Bool`, and `Blob` are non-keyable.
    #[must_use]
    pub fn as_storage_key(&self) -> Option<StorageKey> {
        match self {
            Self::Int(i) => Some(StorageKey::Int(*i)),
            Self::Text(s) => Some(StorageKey::Text(s.clone())),
            Self::Timestamp(t) => Some(StorageKey::Timestamp(*t)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        if let Self::Text(s) = self {
            Some(s.as_str())
        } else {
            None
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

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Self::Blob(b) = self {
            Some(b.as_slice())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<Timestamp> {
        if let Self::Timestamp(t) = self {
            Some(*t)
        } else {
            None
        }
    }

    ///
    /// ORDERING
    ///

    /// Strict comparator for identical orderable variants.
    ///
    /// Returns `None` for mismatched or non-orderable variants.
    #[must_use]
    pub(crate) fn strict_order_cmp(left: &Self, right: &Self) -> Option<Ordering> {
        compare::strict_order_cmp(left, right)
    }

    ///
    /// TEXT COMPARISON
    ///

    fn fold_ci(s: &str) -> Cow<'_, str> {
        if s.is_ascii() {
            return Cow::Owned(s.to_ascii_lowercase());
        }
        Cow::Owned(s.to_lowercase())
    }

    fn text_with_mode(s: &'_ str, mode: TextMode) -> Cow<'_, str> {
        match mode {
            TextMode::Cs => Cow::Borrowed(s),
            TextMode::Ci => Self::fold_ci(s),
        }
    }

    fn text_op(&self, other: &Self, mode: TextMode, f: impl Fn(&str, &str) -> bool) -> Option<bool> {
        let (a, b) = (self.as_text()?, other.as_text()?);
        let a = Self::text_with_mode(a, mode);
        let b = Self::text_with_mode(b, mode);
        Some(f(&a, &b))
    }

    #[must_use]
    /// Case-sensitive/insensitive equality check for text values.
    pub fn text_eq(&self, other: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(other, mode, |a, b| a == b)
    }

    #[must_use]
    /// Check whether `needle` is a substring of `self` under the given text mode.
    pub fn text_contains(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.contains(b))
    }

    #[must_use]
    /// Check whether `self` starts with `needle` under the given text mode.
    pub fn text_starts_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.starts_with(b))
    }

    #[must_use]
    /// Check whether `self` ends with `needle` under the given text mode.
    pub fn text_ends_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.ends_with(b))
    }

    ///
    /// MEMBERSHIP
    ///

    /// Mode-aware equality: text folds case under `Ci`, other kinds compare strictly.
    #[must_use]
    pub fn eq_with_mode(&self, other: &Self, mode: TextMode) -> bool {
        if let (Self::Text(_), Self::Text(_)) = (self, other) {
            return self.text_eq(other, mode).unwrap_or(false);
        }

        self == other
    }

    /// Returns true if `self` equals any member of `list` under the given mode.
    #[must_use]
    pub fn in_list(&self, list: &[Self], mode: TextMode) -> bool {
        list.iter().any(|v| self.eq_with_mode(v, mode))
    }
}

#[macro_export]
macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    bool      => Bool,
    i8        => Int,
    i16       => Int,
    i32       => Int,
    i64       => Int,
    &str      => Text,
    String    => Text,
    Timestamp => Timestamp,
    Vec<u8>   => Blob,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
