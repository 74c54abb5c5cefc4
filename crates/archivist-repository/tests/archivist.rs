use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use archivist_chain::OriginChainRepository;
use archivist_crypto::{verify_bound_witness, Blake3HashProvider, Ed25519Signer, HashProvider, Signer};
use archivist_index::{entry_key, IndexConfig, IndexError, PublicKeyIndexEntry};
use archivist_repository::{
    ArchivistConfig, ArchivistError, ArchivistRepository, NodeAddresses, StaticIpResolver,
};
use archivist_store::{InMemoryKeyValueStore, KeyValueStore, StoragePriority, StoreError, StoreResult};
use archivist_types::{BoundWitness, Fetter, FetterItem, Hash, KeySet, PublicKey, SignatureSet, Witness};
use async_trait::async_trait;

// ---- helpers ----

fn signer(seed: u8) -> Arc<dyn Signer> {
    Arc::new(Ed25519Signer::from_bytes([seed; 32]))
}

/// A single-party block signed by every key in `signers`.
fn signed_block(signers: &[Arc<dyn Signer>], items: Vec<FetterItem>) -> (Hash, BoundWitness) {
    let keys: KeySet = signers.iter().map(|s| s.public_key()).collect();
    let fetter = Fetter::new(keys, items);
    let data = fetter.to_bytes().unwrap();
    let signatures: SignatureSet = signers.iter().map(|s| s.sign(&data).unwrap()).collect();
    let block = BoundWitness::new(vec![fetter], vec![Witness::new(signatures, Vec::new())]).unwrap();
    (Blake3HashProvider::BLOCK.hash(&data), block)
}

async fn open(kv: Arc<dyn KeyValueStore>, config: ArchivistConfig) -> ArchivistRepository {
    ArchivistRepository::open(kv, &config).await.unwrap()
}

fn hash_set(hashes: Vec<Hash>) -> BTreeSet<Hash> {
    hashes.into_iter().collect()
}

/// b1 and b2 signed by A, b2 announces B, b3 signed by B continues b2.
async fn rotation(repo: &ArchivistRepository) -> Result<[Hash; 3]> {
    let (a, b) = (signer(1), signer(2));
    let (h1, b1) = signed_block(&[a.clone()], vec![FetterItem::Index(0)]);
    let (h2, b2) = signed_block(
        &[a.clone()],
        vec![
            FetterItem::Index(1),
            FetterItem::PreviousHash(h1),
            FetterItem::NextPublicKey(b.public_key()),
        ],
    );
    let (h3, b3) = signed_block(&[b], vec![FetterItem::Index(2), FetterItem::PreviousHash(h2)]);
    repo.add_block(h1, &b1).await?;
    repo.add_block(h2, &b2).await?;
    repo.add_block(h3, &b3).await?;
    Ok([h1, h2, h3])
}

// ---- bootstrap ----

#[tokio::test]
async fn bootstrap_is_idempotent() -> Result<()> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let repo = open(kv.clone(), ArchivistConfig::default()).await;

    let genesis = repo.bootstrap_if_needed(vec![signer(1)]).await?;
    let again = repo.bootstrap_if_needed(vec![signer(1)]).await?;

    let genesis = genesis.expect("first call creates genesis");
    assert_eq!(again, None);
    assert_eq!(repo.list_hashes().await?, vec![genesis]);
    assert_eq!(repo.chain().get_index().await, 1);
    assert_eq!(repo.chain().get_previous_hash().await, Some(genesis));

    let block = repo.get_block(&genesis).await?.expect("genesis stored");
    assert_eq!(block.fetters()[0].index(), Some(0));
    verify_bound_witness(&block)?;

    // A restarted node sees the persisted chain and does not re-create it.
    let reopened = open(kv, ArchivistConfig::default()).await;
    assert_eq!(reopened.bootstrap_if_needed(vec![signer(1)]).await?, None);
    assert_eq!(reopened.list_hashes().await?, vec![genesis]);
    Ok(())
}

// ---- blocks ----

#[tokio::test]
async fn append_then_read_round_trips() -> Result<()> {
    let repo = open(Arc::new(InMemoryKeyValueStore::new()), ArchivistConfig::default()).await;
    let (hash, block) = signed_block(&[signer(1), signer(2)], vec![FetterItem::Index(4)]);

    repo.add_block(hash, &block).await?;

    assert!(repo.contains_block(&hash).await?);
    assert_eq!(repo.get_block(&hash).await?, Some(block));
    assert_eq!(repo.get_block(&Hash::from_bytes([0; 32])).await?, None);
    Ok(())
}

#[tokio::test]
async fn pages_follow_insertion_order() -> Result<()> {
    let repo = open(Arc::new(InMemoryKeyValueStore::new()), ArchivistConfig::default()).await;
    let mut hashes = Vec::new();
    for i in 0..5 {
        let (hash, block) = signed_block(&[signer(1)], vec![FetterItem::Index(i)]);
        repo.add_block(hash, &block).await?;
        hashes.push(hash);
    }

    let first = repo.page(2, None).await?;
    assert_eq!(first.hashes(), hashes[0..2].to_vec());
    assert_eq!(first.next_offset, Some(hashes[1]));

    let second = repo.page(2, first.next_offset.as_ref()).await?;
    assert_eq!(second.hashes(), hashes[2..4].to_vec());
    assert_eq!(second.next_offset, Some(hashes[3]));

    let last = repo.page(2, second.next_offset.as_ref()).await?;
    assert_eq!(last.hashes(), vec![hashes[4]]);
    Ok(())
}

#[tokio::test]
async fn removed_blocks_disappear_from_lookups() -> Result<()> {
    let repo = open(Arc::new(InMemoryKeyValueStore::new()), ArchivistConfig::default()).await;
    let [h1, h2, h3] = rotation(&repo).await?;

    assert!(repo.remove_block(&h2).await?);
    assert!(!repo.remove_block(&h2).await?);

    let found = repo.lookup_by_identity(&signer(1).public_key()).await?;
    assert_eq!(hash_set(found.hashes()), hash_set(vec![h1, h3]));
    Ok(())
}

// ---- lineage ----

#[tokio::test]
async fn rotation_lineage_is_complete_from_either_key() -> Result<()> {
    let repo = open(Arc::new(InMemoryKeyValueStore::new()), ArchivistConfig::default()).await;
    let [h1, h2, h3] = rotation(&repo).await?;
    let expected_keys: BTreeSet<PublicKey> =
        [signer(1).public_key(), signer(2).public_key()].into_iter().collect();

    for key in [signer(1).public_key(), signer(2).public_key()] {
        let found = repo.lookup_by_identity(&key).await?;
        assert_eq!(hash_set(found.hashes()), hash_set(vec![h1, h2, h3]));
        assert_eq!(found.public_keys.iter().cloned().collect::<BTreeSet<_>>(), expected_keys);
        assert_eq!(found.blocks.len(), 3, "no block reported twice");
    }
    Ok(())
}

#[tokio::test]
async fn scan_matches_index_for_every_signer() -> Result<()> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let indexed = open(kv.clone(), ArchivistConfig::default()).await;
    for i in 0..8u8 {
        let signers = [signer(1 + i % 3), signer(10 + i)];
        let (hash, block) = signed_block(&signers, vec![FetterItem::Index(i as u64)]);
        indexed.add_block(hash, &block).await?;
    }

    let scanning = open(
        kv,
        ArchivistConfig {
            index: IndexConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;

    for seed in [1, 2, 3, 10, 17] {
        let key = signer(seed).public_key();
        let from_index = indexed.lookup_by_identity(&key).await?;
        let from_scan = scanning.lookup_by_identity(&key).await?;
        assert_eq!(hash_set(from_index.hashes()), hash_set(from_scan.hashes()));
        assert_eq!(from_scan.public_keys, vec![key]);
    }
    Ok(())
}

#[tokio::test]
async fn cyclic_index_entries_terminate() -> Result<()> {
    let kv = Arc::new(InMemoryKeyValueStore::new());
    let repo = open(
        kv.clone(),
        ArchivistConfig {
            index: IndexConfig {
                enabled: true,
                scan_on_miss: false,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .await;

    let (a, b) = (signer(1).public_key(), signer(2).public_key());
    let (ha, block_a) = signed_block(&[signer(1)], vec![FetterItem::Index(0)]);
    let (hb, block_b) = signed_block(&[signer(2)], vec![FetterItem::Index(0)]);
    repo.add_block(ha, &block_a).await?;
    repo.add_block(hb, &block_b).await?;

    // A's parent is B and B lists A as a sibling.
    let crafted = [
        (&a, PublicKeyIndexEntry { hashes: vec![ha, hb], parent: Some(b.clone()), siblings: vec![] }),
        (&b, PublicKeyIndexEntry { hashes: vec![hb], parent: None, siblings: vec![a.clone()] }),
    ];
    for (key, entry) in &crafted {
        kv.write(&entry_key(key), &entry.encode()?, StoragePriority::Med, true, Duration::from_secs(1))
            .await?;
    }

    let found = tokio::time::timeout(Duration::from_secs(5), repo.lookup_by_identity(&a)).await??;
    assert_eq!(found.hashes(), vec![ha, hb]);
    assert_eq!(found.public_keys, vec![a, b]);
    Ok(())
}

// ---- failures ----

/// Key-value store whose index writes fail.
struct IndexWritesFail(InMemoryKeyValueStore);

#[async_trait]
impl KeyValueStore for IndexWritesFail {
    async fn contains_key(&self, key: &[u8]) -> StoreResult<bool> {
        self.0.contains_key(key).await
    }

    async fn read(&self, key: &[u8], timeout: Duration) -> StoreResult<Option<Vec<u8>>> {
        self.0.read(key, timeout).await
    }

    async fn write(
        &self,
        key: &[u8],
        value: &[u8],
        priority: StoragePriority,
        overwrite: bool,
        timeout: Duration,
    ) -> StoreResult<()> {
        if key.starts_with(b"public-keys.") {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.0.write(key, value, priority, overwrite, timeout).await
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        self.0.delete(key).await
    }
}

#[tokio::test]
async fn index_failure_keeps_the_block_and_reports_every_key() -> Result<()> {
    let repo = open(
        Arc::new(IndexWritesFail(InMemoryKeyValueStore::new())),
        ArchivistConfig::default(),
    )
    .await;
    let (hash, block) = signed_block(&[signer(1), signer(2)], vec![FetterItem::Index(0)]);

    let err = repo.add_block(hash, &block).await.unwrap_err();
    match err {
        ArchivistError::Index(IndexError::PartialUpdate { failed, succeeded }) => {
            assert_eq!(failed.len(), 2);
            assert_eq!(succeeded, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.get_block(&hash).await?, Some(block));
    Ok(())
}

// ---- node metadata ----

#[tokio::test]
async fn about_me_reflects_configuration() -> Result<()> {
    let config = ArchivistConfig {
        node_name: Some("archivist-7".into()),
        ..Default::default()
    };
    let repo = ArchivistRepository::open(Arc::new(InMemoryKeyValueStore::new()), &config)
        .await?
        .with_ip_resolver(Arc::new(StaticIpResolver(NodeAddresses {
            public: "198.51.100.4".into(),
            external: "192.168.1.4".into(),
        })));

    let me = repo.get_about_me().await?;
    assert_eq!(me.name, "archivist-7");
    assert_eq!(me.ip, "192.168.1.4");
    assert!(matches!(
        repo.set_about_me(me).await,
        Err(ArchivistError::NotImplemented(_))
    ));
    Ok(())
}
