//! Driver seam: physical connections and the factory that opens them.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::SqlConfig;
use crate::error::{SqlError, SqlResult};

/// A result row keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// One open connection to the database.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement with positional parameters.
    async fn query(&mut self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>>;

    async fn begin(&mut self) -> SqlResult<()>;

    async fn commit(&mut self) -> SqlResult<()>;

    async fn rollback(&mut self) -> SqlResult<()>;

    /// Release the connection. Errors are reported but the connection is
    /// gone either way.
    async fn close(self: Box<Self>) -> SqlResult<()>;
}

/// Opens connections. Implemented by a concrete driver.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &SqlConfig) -> SqlResult<Box<dyn Connection>>;
}

/// Decode rows into caller-chosen records.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> SqlResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| SqlError::Decode(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted connector used by the manager and transaction tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    pub struct Calls {
        pub connects: AtomicU32,
        pub begins: AtomicU32,
        pub commits: AtomicU32,
        pub rollbacks: AtomicU32,
        pub closes: AtomicU32,
        pub queries: Mutex<Vec<(u32, String)>>,
    }

    impl Calls {
        pub fn get(counter: &AtomicU32) -> u32 {
            counter.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    pub struct Script {
        /// Number of initial connect attempts that fail.
        pub failing_connects: u32,
        pub fail_commit: bool,
        pub fail_rollback: bool,
        pub fail_queries: bool,
        pub rows: Vec<Row>,
    }

    pub struct MockConnector {
        pub calls: Arc<Calls>,
        pub script: Script,
        pub connect_times: Mutex<VecDeque<tokio::time::Instant>>,
    }

    impl MockConnector {
        pub fn new(script: Script) -> Self {
            Self {
                calls: Arc::new(Calls::default()),
                script,
                connect_times: Mutex::new(VecDeque::new()),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, _config: &SqlConfig) -> SqlResult<Box<dyn Connection>> {
            self.connect_times
                .lock()
                .unwrap()
                .push_back(tokio::time::Instant::now());
            let attempt = self.calls.connects.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.script.failing_connects {
                return Err(SqlError::Driver(format!("connection refused ({attempt})")));
            }
            Ok(Box::new(MockConnection {
                id: attempt,
                calls: self.calls.clone(),
                fail_commit: self.script.fail_commit,
                fail_rollback: self.script.fail_rollback,
                fail_queries: self.script.fail_queries,
                rows: self.script.rows.clone(),
            }))
        }
    }

    pub struct MockConnection {
        pub id: u32,
        calls: Arc<Calls>,
        fail_commit: bool,
        fail_rollback: bool,
        fail_queries: bool,
        rows: Vec<Row>,
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn query(&mut self, sql: &str, _params: &[Value]) -> SqlResult<Vec<Row>> {
            self.calls
                .queries
                .lock()
                .unwrap()
                .push((self.id, sql.to_string()));
            if self.fail_queries {
                return Err(SqlError::Driver("syntax error".into()));
            }
            Ok(self.rows.clone())
        }

        async fn begin(&mut self) -> SqlResult<()> {
            self.calls.begins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn commit(&mut self) -> SqlResult<()> {
            self.calls.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                return Err(SqlError::Driver("deadlock".into()));
            }
            Ok(())
        }

        async fn rollback(&mut self) -> SqlResult<()> {
            self.calls.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.fail_rollback {
                return Err(SqlError::Driver("connection lost".into()));
            }
            Ok(())
        }

        async fn close(self: Box<Self>) -> SqlResult<()> {
            self.calls.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub fn config() -> SqlConfig {
        SqlConfig {
            host: "localhost".into(),
            user: "archivist".into(),
            database: "ledger".into(),
            ..Default::default()
        }
    }
}
