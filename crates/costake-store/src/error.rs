//! Storage errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Value could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}
