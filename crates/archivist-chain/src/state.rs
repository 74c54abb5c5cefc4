//! Origin chain state persisted in a [`KeyValueStore`].
//!
//! Only public data is persisted (index, previous hash, signer public keys).
//! Signing keys stay in memory and must be reinstalled after a restart.

use std::sync::Arc;
use std::time::Duration;

use archivist_crypto::Signer;
use archivist_store::{KeyValueStore, StoragePriority};
use archivist_types::{Hash, PublicKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ChainError, ChainResult};
use crate::traits::OriginChainRepository;

const STATE_KEY: &[u8] = b"origin-chain-state";

/// The durable part of the chain head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChainState {
    pub index: u64,
    pub previous_hash: Option<Hash>,
    pub signer_keys: Vec<PublicKey>,
}

struct ChainHead {
    persisted: PersistedChainState,
    signers: Vec<Arc<dyn Signer>>,
    next_signers: Option<Vec<Arc<dyn Signer>>>,
    genesis_signer: Option<Arc<dyn Signer>>,
}

pub struct KeyValueOriginChainRepository {
    kv: Arc<dyn KeyValueStore>,
    timeout: Duration,
    // Held across the persist call so the stored record and memory agree.
    head: Mutex<ChainHead>,
}

impl KeyValueOriginChainRepository {
    /// Load persisted state, or start uninitialized if none exists.
    pub async fn open(kv: Arc<dyn KeyValueStore>) -> ChainResult<Self> {
        Self::open_with_timeout(kv, Duration::from_secs(60)).await
    }

    pub async fn open_with_timeout(
        kv: Arc<dyn KeyValueStore>,
        timeout: Duration,
    ) -> ChainResult<Self> {
        let persisted = match kv.read(STATE_KEY, timeout).await? {
            None => PersistedChainState::default(),
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| ChainError::CorruptState(e.to_string()))?,
        };
        debug!(
            index = persisted.index,
            previous = ?persisted.previous_hash.map(|h| h.short_hex()),
            "loaded origin chain state"
        );
        Ok(Self {
            kv,
            timeout,
            head: Mutex::new(ChainHead {
                persisted,
                signers: Vec::new(),
                next_signers: None,
                genesis_signer: None,
            }),
        })
    }

    /// Snapshot of the durable state.
    pub async fn persisted_state(&self) -> PersistedChainState {
        self.head.lock().await.persisted.clone()
    }

    async fn persist(&self, state: &PersistedChainState) -> ChainResult<()> {
        let bytes = bincode::serialize(state).map_err(|e| ChainError::Serialization(e.to_string()))?;
        self.kv
            .write(STATE_KEY, &bytes, StoragePriority::High, true, self.timeout)
            .await?;
        Ok(())
    }
}

fn keys_of(signers: &[Arc<dyn Signer>]) -> Vec<PublicKey> {
    signers.iter().map(|s| s.public_key()).collect()
}

#[async_trait]
impl OriginChainRepository for KeyValueOriginChainRepository {
    async fn get_index(&self) -> u64 {
        self.head.lock().await.persisted.index
    }

    async fn get_previous_hash(&self) -> Option<Hash> {
        self.head.lock().await.persisted.previous_hash
    }

    async fn get_signers(&self) -> Vec<Arc<dyn Signer>> {
        self.head.lock().await.signers.clone()
    }

    async fn set_current_signers(&self, signers: Vec<Arc<dyn Signer>>) -> ChainResult<()> {
        let mut head = self.head.lock().await;
        let mut next = head.persisted.clone();
        next.signer_keys = keys_of(&signers);
        self.persist(&next).await?;

        head.persisted = next;
        if head.genesis_signer.is_none() {
            head.genesis_signer = signers.first().cloned();
        }
        head.signers = signers;
        debug!(count = head.signers.len(), "installed origin signers");
        Ok(())
    }

    async fn set_next_signers(&self, signers: Vec<Arc<dyn Signer>>) -> ChainResult<()> {
        let mut head = self.head.lock().await;
        debug!(count = signers.len(), "queued next origin signers");
        head.next_signers = Some(signers);
        Ok(())
    }

    async fn get_genesis_signer(&self) -> Option<Arc<dyn Signer>> {
        self.head.lock().await.genesis_signer.clone()
    }

    async fn update_origin_chain_state(&self, hash: Hash) -> ChainResult<()> {
        let mut head = self.head.lock().await;
        let mut next = head.persisted.clone();
        next.index += 1;
        next.previous_hash = Some(hash);
        if let Some(rotated) = &head.next_signers {
            next.signer_keys = keys_of(rotated);
        }
        self.persist(&next).await?;

        head.persisted = next;
        if let Some(rotated) = head.next_signers.take() {
            info!(count = rotated.len(), "rotated origin signers");
            head.signers = rotated;
        }
        debug!(
            index = head.persisted.index,
            hash = %hash.short_hex(),
            "advanced origin chain state"
        );
        Ok(())
    }
}
