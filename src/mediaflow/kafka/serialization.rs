//! Payload serialization for bus messages
//!
//! Keys travel as UTF-8 strings, values as JSON. The `Serde` trait is the
//! seam the typed consumer and the publisher share.

use serde::{Deserialize, Serialize};

/// Serialization error shared by producers, consumers and listeners
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("{message}: {source}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid UTF-8 payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The message's type-id header names a type the reader does not handle
    #[error("Unexpected payload type '{found}', expected '{expected}'")]
    UnexpectedType { expected: String, found: String },
}

impl SerializationError {
    pub fn json_error(message: impl Into<String>, source: serde_json::Error) -> Self {
        SerializationError::Json {
            message: message.into(),
            source,
        }
    }
}

/// Converts between values and message bytes
pub trait Serde<T> {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError>;
}

/// Serialize a struct to JSON bytes
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    serde_json::to_vec(value)
        .map_err(|e| SerializationError::json_error("Failed to serialize to JSON bytes", e))
}

/// Deserialize JSON bytes to a struct
pub fn from_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes)
        .map_err(|e| SerializationError::json_error("Failed to deserialize from JSON bytes", e))
}

/// JSON serializer for any serde type
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<T> Serde<T> for JsonSerializer
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        to_json(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        from_json(bytes)
    }
}

/// Raw bytes pass-through; listeners deserialize values themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesSerializer;

impl Serde<Vec<u8>> for BytesSerializer {
    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>, SerializationError> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string keys
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serde<String> for StringSerializer {
    fn serialize(&self, value: &String) -> Result<Vec<u8>, SerializationError> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String, SerializationError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
