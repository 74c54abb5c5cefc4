//! Origin block store persisted through a [`KeyValueStore`].
//!
//! Layout:
//! - `"origin-blocks." ++ hash` -> bincode-encoded [`BoundWitness`]
//! - `"origin-blocks-order"` -> bincode-encoded `u32` count of order chunks
//! - `"origin-blocks-order." ++ chunk index (u32, big endian)` -> bincode-encoded
//!   `Vec<Hash>`, at most one chunk length of hashes
//!
//! Concatenating the chunks in index order gives insertion order. Appends
//! only touch the last chunk; removals rewrite the chunk holding the hash.

use std::sync::Arc;
use std::time::Duration;

use archivist_types::{BoundWitness, Hash};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{page_window, KeyValueStore, OriginBlockPage, OriginBlockRepository, StoragePriority};

const BLOCK_PREFIX: &[u8] = b"origin-blocks.";
const ORDER_KEY: &[u8] = b"origin-blocks-order";
const ORDER_CHUNK_PREFIX: &[u8] = b"origin-blocks-order.";
const ORDER_CHUNK_LEN: usize = 1024;

/// Block store backed by any [`KeyValueStore`].
pub struct KeyValueOriginBlockStore {
    kv: Arc<dyn KeyValueStore>,
    timeout: Duration,
    chunk_len: usize,
    // Serializes read-modify-write of the order chunks.
    order_lock: Mutex<()>,
}

impl KeyValueOriginBlockStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_timeout(kv, Duration::from_secs(60))
    }

    pub fn with_timeout(kv: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self {
            kv,
            timeout,
            chunk_len: ORDER_CHUNK_LEN,
            order_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    fn with_chunk_len(kv: Arc<dyn KeyValueStore>, chunk_len: usize) -> Self {
        Self {
            chunk_len,
            ..Self::new(kv)
        }
    }

    fn block_key(hash: &Hash) -> Vec<u8> {
        let mut key = BLOCK_PREFIX.to_vec();
        key.extend_from_slice(hash.as_bytes());
        key
    }

    fn chunk_key(index: u32) -> Vec<u8> {
        let mut key = ORDER_CHUNK_PREFIX.to_vec();
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    async fn load_record<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>> {
        let Some(bytes) = self.kv.read(key, self.timeout).await? else {
            return Ok(None);
        };
        bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: String::from_utf8_lossy(key).into_owned(),
                reason: e.to_string(),
            })
    }

    async fn save_record<T: Serialize + ?Sized>(&self, key: &[u8], value: &T) -> StoreResult<()> {
        let bytes =
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv
            .write(key, &bytes, StoragePriority::High, true, self.timeout)
            .await
    }

    async fn chunk_count(&self) -> StoreResult<u32> {
        Ok(self.load_record(ORDER_KEY).await?.unwrap_or(0))
    }

    async fn load_chunk(&self, index: u32) -> StoreResult<Vec<Hash>> {
        Ok(self.load_record(&Self::chunk_key(index)).await?.unwrap_or_default())
    }

    async fn load_order(&self) -> StoreResult<Vec<Hash>> {
        let mut order = Vec::new();
        for index in 0..self.chunk_count().await? {
            order.extend(self.load_chunk(index).await?);
        }
        Ok(order)
    }

    /// Append `hash` to the last chunk, opening a new one when it is full.
    async fn append_to_order(&self, hash: Hash) -> StoreResult<()> {
        let count = self.chunk_count().await?;
        let (mut index, mut chunk) = match count.checked_sub(1) {
            Some(last) => (last, self.load_chunk(last).await?),
            None => (0, Vec::new()),
        };
        if chunk.len() >= self.chunk_len {
            index = count;
            chunk = Vec::new();
        }
        chunk.push(hash);
        self.save_record(&Self::chunk_key(index), &chunk).await?;
        if index >= count {
            self.save_record(ORDER_KEY, &(index + 1)).await?;
        }
        Ok(())
    }

    async fn remove_from_order(&self, hash: &Hash) -> StoreResult<()> {
        for index in 0..self.chunk_count().await? {
            let mut chunk = self.load_chunk(index).await?;
            if let Some(pos) = chunk.iter().position(|h| h == hash) {
                chunk.remove(pos);
                return self.save_record(&Self::chunk_key(index), &chunk).await;
            }
        }
        Ok(())
    }

    async fn load_block(&self, hash: &Hash) -> StoreResult<Option<BoundWitness>> {
        let Some(bytes) = self.kv.read(&Self::block_key(hash), self.timeout).await? else {
            return Ok(None);
        };
        BoundWitness::from_bytes(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: format!("origin-blocks.{hash}"),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl OriginBlockRepository for KeyValueOriginBlockStore {
    /// A hash whose block record already exists keeps its order position.
    async fn add_origin_block(&self, hash: Hash, block: &BoundWitness) -> StoreResult<()> {
        let bytes = block.to_bytes()?;
        let block_key = Self::block_key(&hash);
        let _guard = self.order_lock.lock().await;
        let existed = self.kv.contains_key(&block_key).await?;
        self.kv
            .write(&block_key, &bytes, StoragePriority::High, true, self.timeout)
            .await?;
        if !existed {
            self.append_to_order(hash).await?;
        }
        debug!(hash = %hash.short_hex(), replaced = existed, "stored origin block");
        Ok(())
    }

    async fn get_origin_block_by_hash(&self, hash: &Hash) -> StoreResult<Option<BoundWitness>> {
        self.load_block(hash).await
    }

    async fn contains_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
        self.kv.contains_key(&Self::block_key(hash)).await
    }

    async fn remove_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
        let _guard = self.order_lock.lock().await;
        let existed = self.kv.delete(&Self::block_key(hash)).await?;
        self.remove_from_order(hash).await?;
        Ok(existed)
    }

    async fn get_all_origin_block_hashes(&self) -> StoreResult<Vec<Hash>> {
        self.load_order().await
    }

    async fn get_origin_blocks(
        &self,
        limit: usize,
        offset_hash: Option<&Hash>,
    ) -> StoreResult<OriginBlockPage> {
        let order = self.load_order().await?;
        let mut blocks = Vec::new();
        for hash in page_window(&order, limit, offset_hash) {
            if let Some(block) = self.load_block(hash).await? {
                blocks.push((*hash, block));
            }
        }
        let next_offset = blocks.last().map(|(h, _)| *h);
        Ok(OriginBlockPage {
            blocks,
            next_offset,
        })
    }
}
