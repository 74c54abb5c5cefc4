//! Error types for the lineage index.

use archivist_store::StoreError;
use archivist_types::PublicKey;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A persisted entry failed to decode. Never skipped.
    #[error("corrupt index entry at {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    /// Serialization of an entry failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Some keys of a block were indexed, others were not.
    #[error("{} of {} key updates failed", failed.len(), failed.len() + succeeded)]
    PartialUpdate {
        failed: Vec<(PublicKey, IndexError)>,
        succeeded: usize,
    },

    /// An index task stopped before finishing.
    #[error("index task aborted: {0}")]
    TaskAborted(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IndexError {
    /// Whether this error, or any error it aggregates, signals corruption.
    pub fn is_corruption(&self) -> bool {
        match self {
            IndexError::CorruptEntry { .. } => true,
            IndexError::PartialUpdate { failed, .. } => {
                failed.iter().any(|(_, e)| e.is_corruption())
            }
            _ => false,
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
