use std::sync::Arc;

use archivist_index::IndexConfig;
use archivist_sql::{ConnectionManager, Connector, SqlConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ArchivistError, ArchivistResult};

/// Node-level configuration for an archivist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivistConfig {
    /// Reported node name. A random one is generated when unset.
    pub node_name: Option<String>,
    pub version: String,
    /// Whether the node advertises its public rather than external address.
    pub is_public: bool,
    pub graphql_port: u16,
    pub node_port: u16,
    pub sql: Option<SqlConfig>,
    pub index: IndexConfig,
}

impl Default for ArchivistConfig {
    fn default() -> Self {
        Self {
            node_name: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            is_public: false,
            graphql_port: 11001,
            node_port: 11000,
            sql: None,
            index: IndexConfig::default(),
        }
    }
}

impl ArchivistConfig {
    pub fn from_toml_str(s: &str) -> ArchivistResult<Self> {
        toml::from_str(s).map_err(|e| ArchivistError::Config(e.to_string()))
    }

    /// The SQL settings, which an archivist cannot run without.
    pub fn require_sql(&self) -> ArchivistResult<&SqlConfig> {
        let sql = self
            .sql
            .as_ref()
            .ok_or_else(|| ArchivistError::Config("sql settings are required".into()))?;
        sql.validate()
            .map_err(|e| ArchivistError::Config(e.to_string()))?;
        Ok(sql)
    }

    /// Build the SQL connection manager from the required settings.
    pub fn connection_manager(
        &self,
        connector: Arc<dyn Connector>,
    ) -> ArchivistResult<ConnectionManager> {
        let sql = self.require_sql()?.clone();
        Ok(ConnectionManager::new(connector, sql)?)
    }
}
