use std::sync::Arc;

use archivist_crypto::{HashProvider, Signer};
use archivist_store::OriginBlockRepository;
use archivist_types::{BoundWitness, Fetter, FetterItem, Hash, KeySet, SignatureSet, Witness};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ChainError, ChainResult};
use crate::traits::OriginChainRepository;

/// Build and sign the index-0 block for `signers`.
///
/// Returns the block and its hash, which is the digest of the serialized
/// fetter (the exact bytes every signer signed).
pub fn build_genesis_block(
    signers: &[Arc<dyn Signer>],
    hasher: &dyn HashProvider,
) -> ChainResult<(Hash, BoundWitness)> {
    if signers.is_empty() {
        return Err(ChainError::NoSigners);
    }
    let key_set: KeySet = signers.iter().map(|s| s.public_key()).collect();
    let fetter = Fetter::new(key_set, vec![FetterItem::Index(0)]);
    let signing_data = fetter.to_bytes()?;

    let signatures = signers
        .iter()
        .map(|s| s.sign(&signing_data))
        .collect::<Result<SignatureSet, _>>()?;
    let witness = Witness::new(signatures, Vec::new());

    let block = BoundWitness::new(vec![fetter], vec![witness])?;
    Ok((hasher.hash(&signing_data), block))
}

/// Creates the genesis block exactly once per chain.
pub struct GenesisBootstrap {
    hasher: Arc<dyn HashProvider>,
    lock: Mutex<()>,
}

impl GenesisBootstrap {
    pub fn new(hasher: Arc<dyn HashProvider>) -> Self {
        Self {
            hasher,
            lock: Mutex::new(()),
        }
    }

    /// Install `signers` if the chain has none, then create the genesis
    /// block if the chain is still at index 0.
    ///
    /// Returns the genesis hash when a block was created, `None` when the
    /// chain was already active.
    pub async fn bootstrap_if_needed(
        &self,
        chain: &dyn OriginChainRepository,
        blocks: &dyn OriginBlockRepository,
        signers: Vec<Arc<dyn Signer>>,
    ) -> ChainResult<Option<Hash>> {
        let _guard = self.lock.lock().await;

        if chain.get_signers().await.is_empty() {
            chain.set_current_signers(signers).await?;
        }

        let index = chain.get_index().await;
        if index != 0 {
            debug!(index, "origin chain already active, skipping genesis");
            return Ok(None);
        }

        let current = chain.get_signers().await;
        let (hash, block) = build_genesis_block(&current, self.hasher.as_ref())?;
        blocks.add_origin_block(hash, &block).await?;
        chain.update_origin_chain_state(hash).await?;

        info!(hash = %hash.short_hex(), signers = current.len(), "created genesis block");
        Ok(Some(hash))
    }
}
