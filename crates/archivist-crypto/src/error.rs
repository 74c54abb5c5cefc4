use archivist_types::{KeyAlgorithm, TypeError};

/// Errors from hashing and signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key")]
    InvalidKey,

    #[error("no provider for key algorithm {0:?}")]
    UnsupportedAlgorithm(KeyAlgorithm),

    #[error("party {position} signature {index} does not verify")]
    PartySignature { position: usize, index: usize },

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
