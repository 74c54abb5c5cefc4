//! Storage contracts and backends for the archivist.
//!
//! Two layers live here:
//!
//! - [`KeyValueStore`] -- the generic byte-oriented persistent map consumed by
//!   the lineage index and chain state (existence check, timed read,
//!   prioritized write).
//! - [`OriginBlockRepository`] -- the content-addressed store of bound
//!   witnesses keyed by their hash, with enumeration and cursor pagination.
//!
//! # Storage Backends
//!
//! - [`InMemoryKeyValueStore`] -- `HashMap`-based map for tests and embedding
//! - [`InMemoryOriginBlockStore`] -- insertion-ordered block table
//! - [`KeyValueOriginBlockStore`] -- block store persisted through any
//!   [`KeyValueStore`]
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written; a duplicate hash overwrites, never merges.
//! 2. Absence is `Ok(None)` / an empty collection, never an error.
//! 3. Enumeration and pagination follow insertion order.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod kv_blocks;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use kv_blocks::KeyValueOriginBlockStore;
pub use memory::{InMemoryKeyValueStore, InMemoryOriginBlockStore};
pub use traits::{KeyValueStore, OriginBlockPage, OriginBlockRepository, StoragePriority};
