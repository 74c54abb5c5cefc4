//! Origin chain state for the archivist.
//!
//! This crate tracks the mutable head of the node's own chain:
//! - `OriginChainRepository`: current and queued signers, next sequence
//!   index, and the hash of the last block this node authored
//! - `KeyValueOriginChainRepository`: the state persisted in a key-value store
//! - `GenesisBootstrap`: creates the index-0 block exactly once per chain

pub mod error;
pub mod genesis;
pub mod state;
pub mod traits;

pub use error::{ChainError, ChainResult};
pub use genesis::{build_genesis_block, GenesisBootstrap};
pub use state::{KeyValueOriginChainRepository, PersistedChainState};
pub use traits::OriginChainRepository;
