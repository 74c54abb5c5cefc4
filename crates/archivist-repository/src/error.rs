use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchivistError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("critical configuration error: {0}")]
    Config(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("address resolution failed: {0}")]
    AddressResolution(String),

    #[error("store error: {0}")]
    Store(#[from] archivist_store::StoreError),

    #[error("index error: {0}")]
    Index(#[from] archivist_index::IndexError),

    #[error("chain error: {0}")]
    Chain(#[from] archivist_chain::ChainError),

    #[error("sql error: {0}")]
    Sql(#[from] archivist_sql::SqlError),
}

pub type ArchivistResult<T> = Result<T, ArchivistError>;
