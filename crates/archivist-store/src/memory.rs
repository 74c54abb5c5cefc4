use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use archivist_types::{BoundWitness, Hash};
use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::{page_window, KeyValueStore, OriginBlockPage, OriginBlockRepository, StoragePriority};

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. An optional per-call latency makes
/// interleavings between concurrent callers observable in tests.
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    latency: Option<Duration>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    /// A store that yields for `latency` before every read and write.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            latency: Some(latency),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        let map = self.entries.read().map_err(poisoned)?;
        let mut keys: Vec<Vec<u8>> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Run `op`, failing with [`StoreError::Timeout`] if it outlives `timeout`.
/// A write cut off this way has not been applied.
async fn bounded<T>(
    timeout: Duration,
    op: impl std::future::Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout(timeout, op)
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyValueStore")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn contains_key(&self, key: &[u8]) -> StoreResult<bool> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.contains_key(key))
    }

    async fn read(&self, key: &[u8], timeout: Duration) -> StoreResult<Option<Vec<u8>>> {
        bounded(timeout, async {
            self.simulate_latency().await;
            let map = self.entries.read().map_err(poisoned)?;
            Ok(map.get(key).cloned())
        })
        .await
    }

    async fn write(
        &self,
        key: &[u8],
        value: &[u8],
        _priority: StoragePriority,
        overwrite: bool,
        timeout: Duration,
    ) -> StoreResult<()> {
        bounded(timeout, async {
            self.simulate_latency().await;
            let mut map = self.entries.write().map_err(poisoned)?;
            if !overwrite && map.contains_key(key) {
                return Err(StoreError::KeyExists(String::from_utf8_lossy(key).into_owned()));
            }
            map.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        let mut map = self.entries.write().map_err(poisoned)?;
        Ok(map.remove(key).is_some())
    }
}

#[derive(Default)]
struct BlockTable {
    order: Vec<Hash>,
    blocks: HashMap<Hash, BoundWitness>,
}

/// In-memory origin block store.
///
/// Blocks are held behind a `RwLock` and enumerated in insertion order.
#[derive(Default)]
pub struct InMemoryOriginBlockStore {
    table: RwLock<BlockTable>,
}

impl InMemoryOriginBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InMemoryOriginBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryOriginBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl OriginBlockRepository for InMemoryOriginBlockStore {
    async fn add_origin_block(&self, hash: Hash, block: &BoundWitness) -> StoreResult<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        if table.blocks.insert(hash, block.clone()).is_none() {
            table.order.push(hash);
        }
        Ok(())
    }

    async fn get_origin_block_by_hash(&self, hash: &Hash) -> StoreResult<Option<BoundWitness>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.blocks.get(hash).cloned())
    }

    async fn contains_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.blocks.contains_key(hash))
    }

    async fn remove_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
        let mut table = self.table.write().map_err(poisoned)?;
        if table.blocks.remove(hash).is_none() {
            return Ok(false);
        }
        table.order.retain(|h| h != hash);
        Ok(true)
    }

    async fn get_all_origin_block_hashes(&self) -> StoreResult<Vec<Hash>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.order.clone())
    }

    async fn get_origin_blocks(
        &self,
        limit: usize,
        offset_hash: Option<&Hash>,
    ) -> StoreResult<OriginBlockPage> {
        let table = self.table.read().map_err(poisoned)?;
        let blocks: Vec<(Hash, BoundWitness)> = page_window(&table.order, limit, offset_hash)
            .iter()
            .filter_map(|h| table.blocks.get(h).map(|b| (*h, b.clone())))
            .collect();
        let next_offset = blocks.last().map(|(h, _)| *h);
        Ok(OriginBlockPage {
            blocks,
            next_offset,
        })
    }
}
