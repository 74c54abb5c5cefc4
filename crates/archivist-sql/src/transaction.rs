use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::{decode_rows, Connection, Row};
use crate::error::{SqlError, SqlResult};

/// A transaction holding its own connection.
///
/// Consumed by [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// either way the connection is closed afterwards.
pub struct Transaction {
    conn: Option<Box<dyn Connection>>,
}

impl Transaction {
    pub(crate) fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn: Some(conn) }
    }

    pub async fn query(&mut self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>> {
        let conn = self.conn.as_mut().ok_or(SqlError::TransactionClosed)?;
        conn.query(sql, params).await
    }

    pub async fn query_as<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> SqlResult<Vec<T>> {
        decode_rows(self.query(sql, params).await?)
    }

    /// Commit. If the commit fails the transaction is rolled back once and
    /// the commit error is returned.
    pub async fn commit(mut self) -> SqlResult<()> {
        let mut conn = self.conn.take().ok_or(SqlError::TransactionClosed)?;
        let result = match conn.commit().await {
            Ok(()) => {
                debug!("transaction committed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "commit failed, rolling back");
                if let Err(rb) = conn.rollback().await {
                    warn!(error = %rb, "rollback after failed commit also failed");
                }
                Err(e)
            }
        };
        release(conn).await;
        result
    }

    /// Roll back. Never fails; errors are logged.
    pub async fn rollback(mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match conn.rollback().await {
            Ok(()) => debug!("transaction rolled back"),
            Err(e) => warn!(error = %e, "rollback failed"),
        }
        release(conn).await;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("transaction dropped without commit or rollback");
        }
    }
}

async fn release(conn: Box<dyn Connection>) {
    if let Err(e) = conn.close().await {
        debug!(error = %e, "error closing transaction connection");
    }
}
