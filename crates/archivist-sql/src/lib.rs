//! Resilient access to the archivist's SQL backend.
//!
//! The [`ConnectionManager`] owns at most one live backend connection,
//! creates it lazily, and hides transient connectivity failures behind a
//! bounded exponential [`RetryPolicy`]. Statements are never retried; only
//! connection establishment is.
//!
//! Transactions take the manager's connection with them: after
//! [`ConnectionManager::begin_transaction`] the manager is back in the
//! disconnected state and the returned [`Transaction`] is the sole owner of
//! that physical connection. Uncommitted transactional state therefore never
//! leaks into unrelated queries.
//!
//! The database driver is a seam: anything implementing [`Connector`] and
//! [`Connection`] can back the manager.

pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod retry;
pub mod transaction;

pub use config::SqlConfig;
pub use connection::{decode_rows, Connection, Connector, Row};
pub use error::{SqlError, SqlResult};
pub use manager::ConnectionManager;
pub use retry::RetryPolicy;
pub use transaction::Transaction;
