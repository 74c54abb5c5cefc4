//! "About me" metadata a node reports to peers.
//!
//! Always recomputed on request. Only the generated node name is memoised,
//! so an unnamed node keeps one identity for its lifetime.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ArchivistConfig;
use crate::error::{ArchivistError, ArchivistResult};

/// Addresses a node is reachable at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAddresses {
    pub public: String,
    pub external: String,
}

/// Resolves the node's own addresses.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn resolve(&self) -> ArchivistResult<NodeAddresses>;
}

/// Resolver returning fixed addresses.
#[derive(Clone, Debug)]
pub struct StaticIpResolver(pub NodeAddresses);

#[async_trait]
impl IpResolver for StaticIpResolver {
    async fn resolve(&self) -> ArchivistResult<NodeAddresses> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutMe {
    pub name: String,
    pub version: String,
    pub ip: String,
    pub graphql_port: u16,
    pub node_port: u16,
}

pub struct AboutMeService {
    resolver: Option<Arc<dyn IpResolver>>,
    configured_name: Option<String>,
    generated_name: OnceLock<String>,
    version: String,
    is_public: bool,
    graphql_port: u16,
    node_port: u16,
}

impl AboutMeService {
    pub fn new(config: &ArchivistConfig, resolver: Option<Arc<dyn IpResolver>>) -> Self {
        Self {
            resolver,
            configured_name: config.node_name.clone(),
            generated_name: OnceLock::new(),
            version: config.version.clone(),
            is_public: config.is_public,
            graphql_port: config.graphql_port,
            node_port: config.node_port,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IpResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn name(&self) -> &str {
        match &self.configured_name {
            Some(name) => name,
            None => self
                .generated_name
                .get_or_init(|| Uuid::new_v4().to_string()),
        }
    }

    pub async fn get_about_me(&self) -> ArchivistResult<AboutMe> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| ArchivistError::Config("no address resolver available".into()))?;
        let addresses = resolver.resolve().await?;
        let ip = if self.is_public {
            addresses.public
        } else {
            addresses.external
        };
        Ok(AboutMe {
            name: self.name().to_string(),
            version: self.version.clone(),
            ip,
            graphql_port: self.graphql_port,
            node_port: self.node_port,
        })
    }

    pub async fn set_about_me(&self, _about: AboutMe) -> ArchivistResult<()> {
        Err(ArchivistError::NotImplemented("set_about_me"))
    }
}
