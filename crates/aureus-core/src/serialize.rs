use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Serialize to canonical JSON bytes: keys sorted lexicographically, no
/// whitespace, integers decimal. This is the unique byte form used for
/// signing, hashing, and identity, and must be byte-identical across
/// platforms.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    // serde_json::Value keeps object keys in a sorted map, so re-encoding
    // through it yields the sorted-key compact form regardless of struct
    // field order.
    let value = serde_json::to_value(value).map_err(|e| CoreError::Serialization(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Serialize to JSON string
pub fn to_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Serialize to pretty JSON string
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deserialize from JSON string
pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::Deserialization(e.to_string()))
}

/// Deserialize from JSON bytes
pub fn from_json_bytes<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::Deserialization(e.to_string()))
}
