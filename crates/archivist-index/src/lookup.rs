//! Read path: lookup by identity.

use std::collections::{HashSet, VecDeque};

use archivist_types::{BoundWitness, Hash, PublicKey};
use tracing::debug;

use crate::error::IndexResult;
use crate::index::PublicKeyIndex;

/// Blocks attributable to one identity, and the keys it has used.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineageLookup {
    /// Every key reached, starting with the queried one.
    pub public_keys: Vec<PublicKey>,
    /// Each block at most once, in discovery order.
    pub blocks: Vec<(Hash, BoundWitness)>,
}

impl LineageLookup {
    fn empty(pk: &PublicKey) -> Self {
        Self {
            public_keys: vec![pk.clone()],
            blocks: Vec::new(),
        }
    }

    pub fn hashes(&self) -> Vec<Hash> {
        self.blocks.iter().map(|(h, _)| *h).collect()
    }
}

impl PublicKeyIndex {
    /// All blocks signed under `pk` or any key of its rotation lineage.
    ///
    /// Falls back to [`scan`](Self::scan) when the index is disabled, or when
    /// `pk` has no entry and scan-on-miss is on. A miss without fallback is
    /// an empty result, not an error.
    pub async fn lookup(&self, pk: &PublicKey) -> IndexResult<LineageLookup> {
        let config = self.config();
        if !config.enabled {
            return self.scan(pk).await;
        }

        let Some(root) = self.inner.load(pk).await? else {
            if config.scan_on_miss {
                debug!(key = %pk.short_id(), "no index entry, scanning block store");
                return self.scan(pk).await;
            }
            return Ok(LineageLookup::empty(pk));
        };

        let mut visited: HashSet<PublicKey> = HashSet::from([pk.clone()]);
        let mut public_keys = vec![pk.clone()];
        let mut seen_hashes: HashSet<Hash> = HashSet::new();
        let mut hashes = Vec::new();
        let mut queue: VecDeque<PublicKey> = VecDeque::new();
        let mut current = Some(root);

        loop {
            if let Some(entry) = current.take() {
                hashes.extend(entry.hashes.into_iter().filter(|h| seen_hashes.insert(*h)));
                for next in entry.siblings.into_iter().chain(entry.parent) {
                    if visited.insert(next.clone()) {
                        public_keys.push(next.clone());
                        queue.push_back(next);
                    }
                }
            }
            let Some(key) = queue.pop_front() else {
                break;
            };
            current = self.inner.load(&key).await?;
        }

        let mut blocks = Vec::with_capacity(hashes.len());
        for hash in hashes {
            // The store is authoritative; removed blocks simply drop out.
            if let Some(block) = self.inner.blocks.get_origin_block_by_hash(&hash).await? {
                blocks.push((hash, block));
            }
        }

        debug!(
            key = %pk.short_id(),
            keys = public_keys.len(),
            blocks = blocks.len(),
            "resolved lineage"
        );
        Ok(LineageLookup {
            public_keys,
            blocks,
        })
    }

    /// Every stored block whose parties include `pk`, by full store scan.
    ///
    /// Walks a snapshot of the store's hash list and fetches each block by
    /// hash, so concurrent removals only drop the removed blocks. Ignores
    /// rotation lineage.
    pub async fn scan(&self, pk: &PublicKey) -> IndexResult<LineageLookup> {
        let mut result = LineageLookup::empty(pk);
        let hashes = self.inner.blocks.get_all_origin_block_hashes().await?;
        let total = hashes.len();
        for hash in hashes {
            let Some(block) = self.inner.blocks.get_origin_block_by_hash(&hash).await? else {
                continue;
            };
            if block.contains_public_key(pk) {
                result.blocks.push((hash, block));
            }
        }
        debug!(
            key = %pk.short_id(),
            scanned = total,
            blocks = result.blocks.len(),
            "scanned block store"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::IndexConfig;
    use crate::entry::{entry_key, PublicKeyIndexEntry};
    use crate::index::fixtures::{block, h, party, pk};
    use archivist_store::{
        InMemoryKeyValueStore, InMemoryOriginBlockStore, KeyValueStore, OriginBlockPage,
        OriginBlockRepository, StoragePriority, StoreResult,
    };
    use async_trait::async_trait;

    struct Fixture {
        kv: Arc<InMemoryKeyValueStore>,
        blocks: Arc<InMemoryOriginBlockStore>,
        index: PublicKeyIndex,
    }

    fn fixture(config: IndexConfig) -> Fixture {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let blocks = Arc::new(InMemoryOriginBlockStore::new());
        let index = PublicKeyIndex::new(kv.clone(), blocks.clone(), config);
        Fixture { kv, blocks, index }
    }

    impl Fixture {
        async fn append(&self, hash: Hash, block: &BoundWitness) {
            self.blocks.add_origin_block(hash, block).await.unwrap();
            if self.index.is_enabled() {
                self.index.index_block(hash, block).await.unwrap();
            }
        }

        /// b1 and b2 by A, b2 announces B, b3 by B continues b2.
        async fn rotation(&self) {
            self.append(h(1), &block(vec![party(&[pk(1)], None, &[])], 0)).await;
            self.append(h(2), &block(vec![party(&[pk(1)], Some(h(1)), &[pk(2)])], 1))
                .await;
            self.append(h(3), &block(vec![party(&[pk(2)], Some(h(2)), &[])], 2)).await;
        }

        async fn put_entry(&self, key: &PublicKey, entry: &PublicKeyIndexEntry) {
            self.kv
                .write(
                    &entry_key(key),
                    &entry.encode().unwrap(),
                    StoragePriority::Med,
                    true,
                    Duration::from_secs(1),
                )
                .await
                .unwrap();
        }
    }

    fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
        v.sort();
        v
    }

    // ---- lineage ----

    #[tokio::test]
    async fn both_ends_of_a_rotation_see_the_whole_lineage() {
        let f = fixture(IndexConfig::default());
        f.rotation().await;

        for key in [pk(1), pk(2)] {
            let found = f.index.lookup(&key).await.unwrap();
            assert_eq!(sorted(found.hashes()), vec![h(1), h(2), h(3)]);
            assert_eq!(sorted(found.public_keys.clone()), vec![pk(1), pk(2)]);
            assert_eq!(found.public_keys[0], key);
        }
    }

    #[tokio::test]
    async fn cycles_terminate_and_report_each_hash_once() {
        let f = fixture(IndexConfig::default());
        for i in 1..=3 {
            f.blocks
                .add_origin_block(h(i), &block(vec![party(&[pk(i)], None, &[])], i as u64))
                .await
                .unwrap();
        }
        f.put_entry(
            &pk(1),
            &PublicKeyIndexEntry {
                hashes: vec![h(1), h(3)],
                parent: Some(pk(2)),
                siblings: vec![],
            },
        )
        .await;
        f.put_entry(
            &pk(2),
            &PublicKeyIndexEntry {
                hashes: vec![h(2), h(3)],
                parent: Some(pk(1)),
                siblings: vec![pk(1)],
            },
        )
        .await;

        let found = tokio::time::timeout(Duration::from_secs(5), f.index.lookup(&pk(1)))
            .await
            .expect("traversal terminates")
            .unwrap();
        assert_eq!(found.hashes(), vec![h(1), h(3), h(2)]);
        assert_eq!(found.public_keys, vec![pk(1), pk(2)]);
    }

    #[tokio::test]
    async fn keys_without_entries_are_still_reported() {
        let f = fixture(IndexConfig::default());
        f.blocks
            .add_origin_block(h(1), &block(vec![party(&[pk(1)], None, &[])], 0))
            .await
            .unwrap();
        f.put_entry(
            &pk(1),
            &PublicKeyIndexEntry {
                hashes: vec![h(1)],
                parent: None,
                siblings: vec![pk(5)],
            },
        )
        .await;

        let found = f.index.lookup(&pk(1)).await.unwrap();
        assert_eq!(found.public_keys, vec![pk(1), pk(5)]);
        assert_eq!(found.hashes(), vec![h(1)]);
    }

    #[tokio::test]
    async fn removed_blocks_drop_out_of_results() {
        let f = fixture(IndexConfig::default());
        f.rotation().await;
        f.blocks.remove_origin_block(&h(2)).await.unwrap();

        let found = f.index.lookup(&pk(1)).await.unwrap();
        assert_eq!(sorted(found.hashes()), vec![h(1), h(3)]);
    }

    // ---- misses and fallback ----

    #[tokio::test]
    async fn miss_scans_when_enabled() {
        let f = fixture(IndexConfig::default());
        // Stored but never indexed.
        f.blocks
            .add_origin_block(h(1), &block(vec![party(&[pk(1), pk(2)], None, &[])], 0))
            .await
            .unwrap();
        f.blocks
            .add_origin_block(h(2), &block(vec![party(&[pk(3)], None, &[])], 1))
            .await
            .unwrap();

        let found = f.index.lookup(&pk(2)).await.unwrap();
        assert_eq!(found.hashes(), vec![h(1)]);
        assert_eq!(found.public_keys, vec![pk(2)]);
    }

    #[tokio::test]
    async fn miss_without_fallback_is_empty() {
        let f = fixture(IndexConfig {
            scan_on_miss: false,
            ..Default::default()
        });
        f.blocks
            .add_origin_block(h(1), &block(vec![party(&[pk(1)], None, &[])], 0))
            .await
            .unwrap();

        let found = f.index.lookup(&pk(1)).await.unwrap();
        assert!(found.blocks.is_empty());
        assert_eq!(found.public_keys, vec![pk(1)]);
    }

    #[tokio::test]
    async fn disabled_index_always_scans() {
        let f = fixture(IndexConfig {
            enabled: false,
            ..Default::default()
        });
        f.rotation().await;

        let found = f.index.lookup(&pk(1)).await.unwrap();
        assert_eq!(found.hashes(), vec![h(1), h(2)]);
        assert_eq!(found.public_keys, vec![pk(1)]);
        assert!(f.kv.is_empty());
    }

    #[tokio::test]
    async fn scan_agrees_with_index_for_unrotated_keys() {
        let f = fixture(IndexConfig::default());
        for i in 0..6u8 {
            let signers = [pk(i % 3), pk(10 + i)];
            f.append(h(i), &block(vec![party(&signers, None, &[])], i as u64)).await;
        }
        for key in [pk(0), pk(1), pk(2), pk(12)] {
            let indexed = f.index.lookup(&key).await.unwrap();
            let scanned = f.index.scan(&key).await.unwrap();
            assert_eq!(sorted(indexed.hashes()), sorted(scanned.hashes()));
        }
    }

    fn nth_hash(i: u32) -> Hash {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&i.to_be_bytes());
        Hash::from_bytes(bytes)
    }

    #[tokio::test]
    async fn scan_covers_large_stores() {
        let f = fixture(IndexConfig {
            enabled: false,
            ..Default::default()
        });
        for i in 0..300u32 {
            f.append(nth_hash(i), &block(vec![party(&[pk(1)], None, &[])], i as u64))
                .await;
        }
        let found = f.index.scan(&pk(1)).await.unwrap();
        assert_eq!(found.blocks.len(), 300);
        assert_eq!(found.hashes()[299], nth_hash(299));
    }

    /// Block store that deletes the previously read block on every read,
    /// and the cursor block on every page request.
    struct ShrinkingStore {
        inner: InMemoryOriginBlockStore,
        last_read: std::sync::Mutex<Option<Hash>>,
    }

    #[async_trait]
    impl OriginBlockRepository for ShrinkingStore {
        async fn add_origin_block(&self, hash: Hash, block: &BoundWitness) -> StoreResult<()> {
            self.inner.add_origin_block(hash, block).await
        }

        async fn get_origin_block_by_hash(&self, hash: &Hash) -> StoreResult<Option<BoundWitness>> {
            let previous = self.last_read.lock().unwrap().replace(*hash);
            if let Some(previous) = previous {
                self.inner.remove_origin_block(&previous).await?;
            }
            self.inner.get_origin_block_by_hash(hash).await
        }

        async fn contains_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
            self.inner.contains_origin_block(hash).await
        }

        async fn remove_origin_block(&self, hash: &Hash) -> StoreResult<bool> {
            self.inner.remove_origin_block(hash).await
        }

        async fn get_all_origin_block_hashes(&self) -> StoreResult<Vec<Hash>> {
            self.inner.get_all_origin_block_hashes().await
        }

        async fn get_origin_blocks(
            &self,
            limit: usize,
            offset_hash: Option<&Hash>,
        ) -> StoreResult<OriginBlockPage> {
            if let Some(offset) = offset_hash {
                self.inner.remove_origin_block(offset).await?;
            }
            self.inner.get_origin_blocks(limit, offset_hash).await
        }
    }

    #[tokio::test]
    async fn scan_survives_removals_while_running() {
        let store = Arc::new(ShrinkingStore {
            inner: InMemoryOriginBlockStore::new(),
            last_read: std::sync::Mutex::new(None),
        });
        for i in 0..300u32 {
            store
                .add_origin_block(nth_hash(i), &block(vec![party(&[pk(1)], None, &[])], i as u64))
                .await
                .unwrap();
        }
        let index = PublicKeyIndex::new(
            Arc::new(InMemoryKeyValueStore::new()),
            store.clone(),
            IndexConfig {
                enabled: false,
                ..Default::default()
            },
        );

        let found = index.scan(&pk(1)).await.unwrap();

        // Every block was present when the scan reached it.
        assert_eq!(found.blocks.len(), 300);
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_root_entry_is_an_error() {
        let f = fixture(IndexConfig::default());
        f.kv.write(
            &entry_key(&pk(1)),
            br#"{"hashes":5}"#,
            StoragePriority::Med,
            true,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        let err = f.index.lookup(&pk(1)).await.unwrap_err();
        assert!(err.is_corruption());
    }

    #[tokio::test]
    async fn corrupt_entry_behind_the_root_is_an_error() {
        let f = fixture(IndexConfig::default());
        f.rotation().await;
        f.kv.write(
            &entry_key(&pk(2)),
            b"\x00\x01not json",
            StoragePriority::Med,
            true,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        // The root entry is intact; the sibling it points at is not.
        assert!(f.index.get_entry(&pk(1)).await.unwrap().is_some());
        let err = f.index.lookup(&pk(1)).await.unwrap_err();
        assert!(err.is_corruption());
    }
}
