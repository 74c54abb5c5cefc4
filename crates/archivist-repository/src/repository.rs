use std::sync::Arc;

use archivist_chain::{
    GenesisBootstrap, KeyValueOriginChainRepository, OriginChainRepository,
};
use archivist_crypto::{Blake3HashProvider, HashProvider, Signer};
use archivist_index::{LineageLookup, PublicKeyIndex};
use archivist_sql::ConnectionManager;
use archivist_store::{
    KeyValueOriginBlockStore, KeyValueStore, OriginBlockPage, OriginBlockRepository,
};
use archivist_types::{BoundWitness, Hash, PublicKey};
use tracing::{debug, info};

use crate::about::{AboutMe, AboutMeService, IpResolver};
use crate::config::ArchivistConfig;
use crate::error::ArchivistResult;

/// Block storage, lineage index, and origin chain behind one API.
///
/// The block store is authoritative. The index is derived from it and is
/// updated after every successful block write.
pub struct ArchivistRepository {
    blocks: Arc<dyn OriginBlockRepository>,
    index: PublicKeyIndex,
    chain: Arc<dyn OriginChainRepository>,
    genesis: GenesisBootstrap,
    about: AboutMeService,
    sql: Option<Arc<ConnectionManager>>,
}

impl ArchivistRepository {
    /// Open a repository whose blocks, index, and chain state all live in `kv`.
    pub async fn open(kv: Arc<dyn KeyValueStore>, config: &ArchivistConfig) -> ArchivistResult<Self> {
        let blocks: Arc<dyn OriginBlockRepository> =
            Arc::new(KeyValueOriginBlockStore::new(kv.clone()));
        let chain = Arc::new(KeyValueOriginChainRepository::open(kv.clone()).await?);
        Ok(Self::from_parts(
            kv,
            blocks,
            chain,
            Arc::new(Blake3HashProvider::BLOCK),
            config,
        ))
    }

    /// Assemble a repository from explicit components.
    pub fn from_parts(
        kv: Arc<dyn KeyValueStore>,
        blocks: Arc<dyn OriginBlockRepository>,
        chain: Arc<dyn OriginChainRepository>,
        hasher: Arc<dyn HashProvider>,
        config: &ArchivistConfig,
    ) -> Self {
        let index = PublicKeyIndex::new(kv, blocks.clone(), config.index.clone());
        Self {
            blocks,
            index,
            chain,
            genesis: GenesisBootstrap::new(hasher),
            about: AboutMeService::new(config, None),
            sql: None,
        }
    }

    pub fn with_ip_resolver(mut self, resolver: Arc<dyn IpResolver>) -> Self {
        self.about = self.about.with_resolver(resolver);
        self
    }

    pub fn with_sql(mut self, manager: ConnectionManager) -> Self {
        self.sql = Some(Arc::new(manager));
        self
    }

    pub fn index(&self) -> &PublicKeyIndex {
        &self.index
    }

    pub fn chain(&self) -> &Arc<dyn OriginChainRepository> {
        &self.chain
    }

    pub fn sql(&self) -> Option<&Arc<ConnectionManager>> {
        self.sql.as_ref()
    }

    // ---- Blocks ----

    /// Store `block` under `hash`, then index every party's keys.
    ///
    /// The block stays stored even if indexing fails; the index error is
    /// returned so the caller knows lookups may under-report until a reindex.
    pub async fn add_block(&self, hash: Hash, block: &BoundWitness) -> ArchivistResult<()> {
        self.blocks.add_origin_block(hash, block).await?;
        if self.index.is_enabled() {
            self.index.index_block(hash, block).await?;
        }
        debug!(hash = %hash.short_hex(), parties = block.party_count(), "added block");
        Ok(())
    }

    /// Add a block this node authored and advance the origin chain to it.
    pub async fn add_own_block(&self, hash: Hash, block: &BoundWitness) -> ArchivistResult<()> {
        self.add_block(hash, block).await?;
        self.chain.update_origin_chain_state(hash).await?;
        Ok(())
    }

    pub async fn get_block(&self, hash: &Hash) -> ArchivistResult<Option<BoundWitness>> {
        Ok(self.blocks.get_origin_block_by_hash(hash).await?)
    }

    pub async fn contains_block(&self, hash: &Hash) -> ArchivistResult<bool> {
        Ok(self.blocks.contains_origin_block(hash).await?)
    }

    /// Remove a block from the store. Index entries keep the hash; lookups
    /// skip it.
    pub async fn remove_block(&self, hash: &Hash) -> ArchivistResult<bool> {
        Ok(self.blocks.remove_origin_block(hash).await?)
    }

    pub async fn list_hashes(&self) -> ArchivistResult<Vec<Hash>> {
        Ok(self.blocks.get_all_origin_block_hashes().await?)
    }

    pub async fn page(
        &self,
        limit: usize,
        offset_hash: Option<&Hash>,
    ) -> ArchivistResult<OriginBlockPage> {
        Ok(self.blocks.get_origin_blocks(limit, offset_hash).await?)
    }

    // ---- Identity ----

    pub async fn lookup_by_identity(&self, pk: &PublicKey) -> ArchivistResult<LineageLookup> {
        Ok(self.index.lookup(pk).await?)
    }

    // ---- Origin chain ----

    /// Create the genesis block if the chain has none yet.
    ///
    /// Returns the genesis hash when this call created it.
    pub async fn bootstrap_if_needed(
        &self,
        signers: Vec<Arc<dyn Signer>>,
    ) -> ArchivistResult<Option<Hash>> {
        let created = self
            .genesis
            .bootstrap_if_needed(self.chain.as_ref(), self.blocks.as_ref(), signers)
            .await?;

        if let Some(hash) = created {
            if self.index.is_enabled() {
                if let Some(block) = self.blocks.get_origin_block_by_hash(&hash).await? {
                    self.index.index_block(hash, &block).await?;
                }
            }
            info!(hash = %hash.short_hex(), "origin chain bootstrapped");
        }
        Ok(created)
    }

    // ---- Node metadata ----

    pub async fn get_about_me(&self) -> ArchivistResult<AboutMe> {
        self.about.get_about_me().await
    }

    pub async fn set_about_me(&self, about: AboutMe) -> ArchivistResult<()> {
        self.about.set_about_me(about).await
    }

    /// Release backend connections. Safe to call more than once.
    pub async fn shutdown(&self) -> ArchivistResult<()> {
        if let Some(sql) = &self.sql {
            sql.close().await?;
        }
        Ok(())
    }
}
