use std::time::Duration;

use archivist_types::{BoundWitness, Hash};
use async_trait::async_trait;

use crate::error::StoreResult;

/// Write priority hint passed through to the key-value backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoragePriority {
    High,
    Med,
    Low,
}

/// Generic byte-oriented persistent map.
///
/// Implementations must be thread-safe. A single call is atomic with respect
/// to other calls on the same key, but there is no compare-and-swap: callers
/// doing read-modify-write must serialize themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Check whether a key exists.
    async fn contains_key(&self, key: &[u8]) -> StoreResult<bool>;

    /// Read a value. `timeout` bounds only this call.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn read(&self, key: &[u8], timeout: Duration) -> StoreResult<Option<Vec<u8>>>;

    /// Write a value.
    ///
    /// With `overwrite == false` an existing key is rejected with
    /// [`StoreError::KeyExists`](crate::StoreError::KeyExists).
    async fn write(
        &self,
        key: &[u8],
        value: &[u8],
        priority: StoragePriority,
        overwrite: bool,
        timeout: Duration,
    ) -> StoreResult<()>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &[u8]) -> StoreResult<bool>;
}

/// One page of a cursor-based scan over the origin block store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OriginBlockPage {
    /// At most `limit` blocks, in store order.
    pub blocks: Vec<(Hash, BoundWitness)>,
    /// Hash of the last block returned; pass it back to continue.
    /// `None` when the page is empty.
    pub next_offset: Option<Hash>,
}

impl OriginBlockPage {
    pub fn hashes(&self) -> Vec<Hash> {
        self.blocks.iter().map(|(h, _)| *h).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Content-addressed store of bound witnesses keyed by their hash.
///
/// All implementations must satisfy these invariants:
/// - Adding a hash that already exists replaces the record in place and keeps
///   its position in enumeration order.
/// - Missing blocks are `Ok(None)`, never an error.
/// - Enumeration and pagination use the same, stable, store-defined order.
#[async_trait]
pub trait OriginBlockRepository: Send + Sync {
    async fn add_origin_block(&self, hash: Hash, block: &BoundWitness) -> StoreResult<()>;

    async fn get_origin_block_by_hash(&self, hash: &Hash) -> StoreResult<Option<BoundWitness>>;

    async fn contains_origin_block(&self, hash: &Hash) -> StoreResult<bool>;

    /// Remove a block. Returns `true` if it existed.
    async fn remove_origin_block(&self, hash: &Hash) -> StoreResult<bool>;

    async fn get_all_origin_block_hashes(&self) -> StoreResult<Vec<Hash>>;

    /// Return up to `limit` blocks starting after `offset_hash`, or from the
    /// start if it is `None`. An unknown `offset_hash` yields an empty page.
    async fn get_origin_blocks(
        &self,
        limit: usize,
        offset_hash: Option<&Hash>,
    ) -> StoreResult<OriginBlockPage>;
}

/// Slice an ordered hash list into the window a page request selects.
pub(crate) fn page_window<'a>(
    order: &'a [Hash],
    limit: usize,
    offset_hash: Option<&Hash>,
) -> &'a [Hash] {
    let start = match offset_hash {
        None => 0,
        Some(offset) => match order.iter().position(|h| h == offset) {
            Some(pos) => pos + 1,
            None => return &[],
        },
    };
    let end = start.saturating_add(limit).min(order.len());
    &order[start.min(end)..end]
}
