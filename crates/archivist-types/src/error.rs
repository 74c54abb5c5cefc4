use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown key algorithm tag: {0:#04x}")]
    UnknownAlgorithm(u8),

    #[error("empty canonical key encoding")]
    EmptyKey,

    #[error("misaligned bound witness: {fetters} fetters, {witnesses} witnesses")]
    MisalignedParties { fetters: usize, witnesses: usize },

    #[error("party {position} has {keys} keys but {signatures} signatures")]
    MisalignedSignatures {
        position: usize,
        keys: usize,
        signatures: usize,
    },

    #[error("bound witness has no parties")]
    NoParties,

    #[error("serialization error: {0}")]
    Serialization(String),
}
