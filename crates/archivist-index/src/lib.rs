//! Public-key lineage index for the archivist.
//!
//! Maps each public key to the blocks it co-signed and to its place in a
//! rotation lineage, so that "every block of identity K" does not require
//! scanning the whole origin block store.
//!
//! # Key Types
//!
//! - [`PublicKeyIndex`]: incremental write path and breadth-first lookup
//! - [`PublicKeyIndexEntry`]: the persisted per-key record
//! - [`LineageLookup`]: lookup result (keys reached and their blocks)
//! - [`IndexConfig`]: enable and scan-fallback switches

pub mod config;
pub mod entry;
pub mod error;
pub mod index;
pub mod locks;
pub mod lookup;

pub use config::IndexConfig;
pub use entry::{entry_key, PublicKeyIndexEntry};
pub use error::{IndexError, IndexResult};
pub use index::PublicKeyIndex;
pub use lookup::LineageLookup;
