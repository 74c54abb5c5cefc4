//! Hashing and signing providers for the archivist.
//!
//! The storage engine treats cryptography as opaque: it only needs a
//! [`HashProvider`] that turns signing data into a [`Hash`] and [`Signer`]s
//! that sign bytes under a [`PublicKey`]. This crate defines those contracts
//! and ships BLAKE3 and Ed25519 providers.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.
//!
//! [`Hash`]: archivist_types::Hash
//! [`PublicKey`]: archivist_types::PublicKey

pub mod error;
pub mod hasher;
pub mod signer;

pub use error::{CryptoError, CryptoResult};
pub use hasher::{Blake3HashProvider, HashProvider};
pub use signer::{verify_bound_witness, verify_signature, Ed25519Signer, Signer};
