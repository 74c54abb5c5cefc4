use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    /// Required configuration is missing. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection establishment failed on every allowed attempt.
    #[error("could not connect after {attempts} attempts: {reason}")]
    ConnectionFailed { attempts: u32, reason: String },

    /// Error reported by the database driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// Rows could not be decoded into the requested type.
    #[error("row decode error: {0}")]
    Decode(String),

    /// The transaction already finished.
    #[error("transaction is no longer open")]
    TransactionClosed,
}

pub type SqlResult<T> = Result<T, SqlError>;
