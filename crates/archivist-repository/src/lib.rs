//! Archivist repository.
//!
//! Ties the origin block store, the public-key lineage index, and the origin
//! chain state together:
//!
//! - append: block store first, then the index for every party's keys
//! - lookup by hash, enumeration, and pagination straight from the store
//! - lookup by identity through the lineage index, with scan fallback
//! - genesis bootstrap of the node's own chain
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use archivist_crypto::{Ed25519Signer, Signer};
//! use archivist_repository::{ArchivistConfig, ArchivistRepository};
//! use archivist_store::InMemoryKeyValueStore;
//!
//! # async fn demo() -> Result<(), archivist_repository::ArchivistError> {
//! let config = ArchivistConfig::default();
//! let repo = ArchivistRepository::open(Arc::new(InMemoryKeyValueStore::new()), &config).await?;
//! let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::generate());
//! repo.bootstrap_if_needed(vec![signer.clone()]).await?;
//! let mine = repo.lookup_by_identity(&signer.public_key()).await?;
//! assert_eq!(mine.blocks.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod about;
pub mod config;
pub mod error;
pub mod repository;

pub use about::{AboutMe, AboutMeService, IpResolver, NodeAddresses, StaticIpResolver};
pub use config::ArchivistConfig;
pub use error::{ArchivistError, ArchivistResult};
pub use repository::ArchivistRepository;
