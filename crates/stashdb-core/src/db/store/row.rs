use crate::{
    db::record::Record,
    error::{ErrorClass, ErrorOrigin, InternalError},
    serialize::{deserialize, serialize},
};
use thiserror::Error as ThisError;

/// Max serialized bytes for a single row to keep value loads bounded.
pub const MAX_ROW_BYTES: u32 = 4 * 1024 * 1024;

///
/// RawRowError
///

#[derive(Debug, ThisError)]
pub enum RawRowError {
    #[error("row exceeds max size: {len} bytes (limit {MAX_ROW_BYTES})")]
    TooLarge { len: usize },
}

impl From<RawRowError> for InternalError {
    fn from(err: RawRowError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Store, err.to_string())
    }
}

///
/// RawRow
/// One encoded record as stored in a partition.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawRow(Vec<u8>);

impl RawRow {
    pub fn try_new(bytes: Vec<u8>) -> Result<Self, RawRowError> {
        if bytes.len() > MAX_ROW_BYTES as usize {
            return Err(RawRowError::TooLarge { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    /// Encode a record into its stored form.
    pub fn encode(record: &Record) -> Result<Self, InternalError> {
        let bytes = serialize(record)?;
        Ok(Self::try_new(bytes)?)
    }

    /// Decode the stored form back into a record.
    pub fn decode(&self) -> Result<Record, InternalError> {
        deserialize(&self.0).map_err(|e| InternalError::store_corruption(e.to_string()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
