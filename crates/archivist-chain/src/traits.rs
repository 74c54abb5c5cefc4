use std::sync::Arc;

use archivist_crypto::Signer;
use archivist_types::{Hash, KeySet};
use async_trait::async_trait;

use crate::error::ChainResult;

/// Read and write boundary for the node's origin chain head.
///
/// `index` starts at 0 (uninitialized) and grows by one for every block the
/// node appends; `previous_hash` is the hash of the most recent of them.
#[async_trait]
pub trait OriginChainRepository: Send + Sync {
    async fn get_index(&self) -> u64;

    async fn get_previous_hash(&self) -> Option<Hash>;

    async fn get_signers(&self) -> Vec<Arc<dyn Signer>>;

    /// Public keys of the current signers, in signing order.
    async fn get_signer_keys(&self) -> KeySet {
        self.get_signers()
            .await
            .iter()
            .map(|s| s.public_key())
            .collect()
    }

    /// Replace the current signer set. The first set ever installed is
    /// remembered as the genesis signer.
    async fn set_current_signers(&self, signers: Vec<Arc<dyn Signer>>) -> ChainResult<()>;

    /// Queue a signer set that takes over on the next state update.
    async fn set_next_signers(&self, signers: Vec<Arc<dyn Signer>>) -> ChainResult<()>;

    async fn get_genesis_signer(&self) -> Option<Arc<dyn Signer>>;

    /// Record `hash` as the newest block, advance the index, and rotate in
    /// any queued signers.
    async fn update_origin_chain_state(&self, hash: Hash) -> ChainResult<()>;
}
