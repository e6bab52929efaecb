use crate::error::InternalError;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

/// Generic CBOR serialization infrastructure.
///
/// This module is format-level only: engine-specific decode policy (row size
/// bounds, corruption classification) belongs in the store wrappers.

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        match &err {
            SerializeError::Serialize(_) => Self::serialize_internal(err.to_string()),
            SerializeError::Deserialize(_) => Self::serialize_corruption(err.to_string()),
        }
    }
}

/// Serialize a value into CBOR bytes.
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    serde_cbor::to_vec(value).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize a value from CBOR bytes.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializeError> {
    serde_cbor::from_slice(bytes).map_err(|e| SerializeError::Deserialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn round_trips_values() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-5),
            Value::Text("hello".to_string()),
            Value::Blob(vec![0, 1, 2]),
        ];
        let bytes = serialize(&values).unwrap();
        let decoded: Vec<Value> = deserialize(&bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = deserialize::<Vec<Value>>(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, SerializeError::Deserialize(_)));
    }
}
