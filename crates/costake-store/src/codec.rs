//! Value codec

use crate::error::{Result, StoreError};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a value for storage
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Codec(e.to_string()))
}

/// Decode a stored value
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))
}
