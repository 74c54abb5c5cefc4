//! The lineage index and its write path.
//!
//! Appending block `B` updates, for every public key of every party:
//! - the key's own entry: `B`'s hash is appended, and the key is linked to
//!   the ultimate ancestor of its lineage if `B` continues a block in which
//!   some party announced this key as its next key
//! - that ancestor's entry: the key is registered as a sibling
//!
//! Each entry mutation is a read-modify-write under the key's lock. Keys of
//! one block are updated concurrently, bounded by
//! [`IndexConfig::write_concurrency`].

use std::collections::HashMap;
use std::sync::Arc;

use archivist_store::{KeyValueStore, OriginBlockRepository, StoragePriority};
use archivist_types::{BoundWitness, Hash, PublicKey};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::IndexConfig;
use crate::entry::{entry_key, PublicKeyIndexEntry};
use crate::error::{IndexError, IndexResult};
use crate::locks::KeyLocks;

/// Public-key lineage index over an origin block store.
///
/// Cheap to clone; clones share state and locks.
#[derive(Clone)]
pub struct PublicKeyIndex {
    pub(crate) inner: Arc<IndexInner>,
}

pub(crate) struct IndexInner {
    pub(crate) kv: Arc<dyn KeyValueStore>,
    pub(crate) blocks: Arc<dyn OriginBlockRepository>,
    pub(crate) config: IndexConfig,
    locks: KeyLocks,
}

impl PublicKeyIndex {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        blocks: Arc<dyn OriginBlockRepository>,
        config: IndexConfig,
    ) -> Self {
        Self {
            inner: Arc::new(IndexInner {
                kv,
                blocks,
                config,
                locks: KeyLocks::new(),
            }),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    /// Read the stored entry for `pk`.
    pub async fn get_entry(&self, pk: &PublicKey) -> IndexResult<Option<PublicKeyIndexEntry>> {
        self.inner.load(pk).await
    }

    /// Index every key of `block`, stored under `hash`.
    ///
    /// All keys are attempted even if some fail; failures are reported
    /// together as [`IndexError::PartialUpdate`].
    pub async fn index_block(&self, hash: Hash, block: &BoundWitness) -> IndexResult<()> {
        let mut predecessors: HashMap<Hash, Option<Arc<BoundWitness>>> = HashMap::new();
        let mut work: Vec<(PublicKey, Option<Arc<BoundWitness>>)> = Vec::new();

        for party in block.parties() {
            let prev = match party.fetter.previous_hash() {
                None => None,
                Some(prev_hash) => {
                    if !predecessors.contains_key(&prev_hash) {
                        let found = self.inner.blocks.get_origin_block_by_hash(&prev_hash).await?;
                        if found.is_none() {
                            debug!(
                                hash = %hash.short_hex(),
                                previous = %prev_hash.short_hex(),
                                "previous block not in store, no lineage link"
                            );
                        }
                        predecessors.insert(prev_hash, found.map(Arc::new));
                    }
                    predecessors.get(&prev_hash).cloned().flatten()
                }
            };
            for pk in party.key_set().iter() {
                work.push((pk.clone(), prev.clone()));
            }
        }

        let total = work.len();
        let permits = Arc::new(Semaphore::new(self.inner.config.write_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (pk, prev) in work {
            let inner = self.inner.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => inner.index_key(&pk, hash, prev.as_deref()).await,
                    Err(e) => Err(IndexError::TaskAborted(e.to_string())),
                };
                (pk, result)
            });
        }

        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((pk, Err(e))) => {
                    warn!(key = %pk.short_id(), hash = %hash.short_hex(), error = %e, "index update failed");
                    failed.push((pk, e));
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!(hash = %hash.short_hex(), error = %e, "index task cancelled");
                    return Err(IndexError::TaskAborted(e.to_string()));
                }
            }
        }

        if failed.is_empty() {
            debug!(hash = %hash.short_hex(), keys = total, "indexed block");
            Ok(())
        } else {
            Err(IndexError::PartialUpdate {
                succeeded: total - failed.len(),
                failed,
            })
        }
    }

    /// Rebuild entries for every block currently in the store, in store order.
    pub async fn reindex_all(&self) -> IndexResult<usize> {
        let hashes = self.inner.blocks.get_all_origin_block_hashes().await?;
        let mut indexed = 0;
        for hash in hashes {
            if let Some(block) = self.inner.blocks.get_origin_block_by_hash(&hash).await? {
                self.index_block(hash, &block).await?;
                indexed += 1;
            }
        }
        debug!(blocks = indexed, "rebuilt lineage index");
        Ok(indexed)
    }
}

impl IndexInner {
    pub(crate) async fn load(&self, pk: &PublicKey) -> IndexResult<Option<PublicKeyIndexEntry>> {
        match self.kv.read(&entry_key(pk), self.config.read_timeout).await? {
            None => Ok(None),
            Some(bytes) => PublicKeyIndexEntry::decode(pk, &bytes).map(Some),
        }
    }

    async fn store(&self, pk: &PublicKey, entry: &PublicKeyIndexEntry) -> IndexResult<()> {
        let bytes = entry.encode()?;
        self.kv
            .write(
                &entry_key(pk),
                &bytes,
                StoragePriority::Med,
                true,
                self.config.read_timeout,
            )
            .await?;
        Ok(())
    }

    /// Find the ultimate ancestor of `pk` through `prev`, if `prev` announced it.
    async fn resolve_ancestor(
        &self,
        pk: &PublicKey,
        prev: &BoundWitness,
    ) -> IndexResult<Option<PublicKey>> {
        let Some(announcer) = prev
            .parties()
            .find(|party| party.fetter.next_public_keys().any(|next| next == pk))
        else {
            return Ok(None);
        };

        for member in announcer.key_set().iter() {
            if let Some(entry) = self.load(member).await? {
                let ancestor = entry.parent.unwrap_or_else(|| member.clone());
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }

    async fn index_key(
        &self,
        pk: &PublicKey,
        hash: Hash,
        prev: Option<&BoundWitness>,
    ) -> IndexResult<()> {
        let ancestor = match prev {
            Some(prev) => self.resolve_ancestor(pk, prev).await?,
            None => None,
        }
        .filter(|ancestor| ancestor != pk);

        if let Some(ancestor) = &ancestor {
            let _guard = self.locks.lock(ancestor).await;
            let mut entry = self.load(ancestor).await?.unwrap_or_default();
            if entry.add_sibling(pk.clone()) {
                self.store(ancestor, &entry).await?;
            }
        }

        let _guard = self.locks.lock(pk).await;
        let mut entry = self.load(pk).await?.unwrap_or_default();
        if entry.parent.is_none() {
            if let Some(ancestor) = ancestor {
                debug!(key = %pk.short_id(), ancestor = %ancestor.short_id(), "linked key to lineage");
                entry.parent = Some(ancestor);
            }
        }
        entry.add_hash(hash);
        self.store(pk, &entry).await?;
        Ok(())
    }
}
