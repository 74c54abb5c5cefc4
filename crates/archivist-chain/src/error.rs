use archivist_crypto::CryptoError;
use archivist_store::StoreError;
use archivist_types::TypeError;

/// Errors produced by origin chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("no signers available to create the genesis block")]
    NoSigners,

    #[error("persisted chain state is corrupt: {0}")]
    CorruptState(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type ChainResult<T> = Result<T, ChainError>;
