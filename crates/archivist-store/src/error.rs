use std::time::Duration;

use archivist_types::TypeError;

/// Errors from key-value and block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A non-overwriting write found the key already present.
    #[error("key already exists: {0}")]
    KeyExists(String),

    /// The backend did not answer within the caller's timeout.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be decoded.
    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Serialization failure on write.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure inside the storage backend itself.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
