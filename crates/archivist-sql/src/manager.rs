use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::SqlConfig;
use crate::connection::{decode_rows, Connection, Connector, Row};
use crate::error::{SqlError, SqlResult};
use crate::retry::RetryPolicy;
use crate::transaction::Transaction;

/// Owns the shared backend connection.
///
/// States: disconnected (no connection held) and connected (exactly one
/// connection held). Queries run on the held connection, establishing it
/// first if needed. Beginning a transaction moves the connection into the
/// [`Transaction`] and leaves the manager disconnected.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    config: SqlConfig,
    retry: RetryPolicy,
    current: Mutex<Option<Box<dyn Connection>>>,
}

impl ConnectionManager {
    /// Fails with [`SqlError::Config`] if the configuration is incomplete.
    pub fn new(connector: Arc<dyn Connector>, config: SqlConfig) -> SqlResult<Self> {
        config.validate()?;
        let retry = config.retry_policy();
        Ok(Self {
            connector,
            config,
            retry,
            current: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SqlConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Whether a shared connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Execute a statement on the shared connection.
    ///
    /// Connection establishment is retried; the statement itself is not.
    /// Retries run without holding the manager's lock.
    pub async fn query(&self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            drop(current);
            let fresh = self.connect_with_retry().await?;
            current = self.current.lock().await;
            if current.is_some() {
                // Another caller connected first.
                debug!("discarding redundant sql connection");
                if let Err(e) = fresh.close().await {
                    debug!(error = %e, "error closing redundant connection");
                }
            } else {
                *current = Some(fresh);
            }
        }
        let Some(conn) = current.as_mut() else {
            return Err(SqlError::ConnectionFailed {
                attempts: 0,
                reason: "no connection available".into(),
            });
        };
        conn.query(sql, params).await
    }

    /// Execute a statement and decode each row into `T`.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> SqlResult<Vec<T>> {
        decode_rows(self.query(sql, params).await?)
    }

    /// Start a transaction on a connection the manager no longer shares.
    ///
    /// The held connection is detached if there is one, otherwise a fresh
    /// connection is established with retry.
    pub async fn begin_transaction(&self) -> SqlResult<Transaction> {
        let detached = self.current.lock().await.take();
        let mut conn = match detached {
            Some(conn) => conn,
            None => self.connect_with_retry().await?,
        };

        if let Err(e) = conn.begin().await {
            warn!(error = %e, "failed to begin transaction");
            if let Err(close_err) = conn.close().await {
                debug!(error = %close_err, "error closing connection after failed begin");
            }
            return Err(e);
        }
        debug!("transaction started");
        Ok(Transaction::new(conn))
    }

    /// Release the shared connection if one is held. Safe to call repeatedly.
    pub async fn close(&self) -> SqlResult<()> {
        let Some(conn) = self.current.lock().await.take() else {
            return Ok(());
        };
        debug!("closing sql connection");
        conn.close().await
    }

    async fn connect_with_retry(&self) -> SqlResult<Box<dyn Connection>> {
        let mut attempt = 1;
        loop {
            match self.connector.connect(&self.config).await {
                Ok(conn) => {
                    debug!(attempt, host = %self.config.host, "sql connection established");
                    return Ok(conn);
                }
                Err(SqlError::Config(reason)) => return Err(SqlError::Config(reason)),
                Err(e) => match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            attempt,
                            max_tries = self.retry.max_tries(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "sql connection failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(attempts = attempt, error = %e, "giving up on sql connection");
                        return Err(SqlError::ConnectionFailed {
                            attempts: attempt,
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }
    }
}
