//! Foundation types for the archivist.
//!
//! This crate provides the ledger record types stored and indexed by the
//! archivist. Every other archivist crate depends on `archivist-types`.
//!
//! # Key Types
//!
//! - [`Hash`]: Fixed-width digest identifying a bound witness
//! - [`PublicKey`]: Identity credential, compared by its canonical bytes
//! - [`KeySet`] / [`SignatureSet`]: Positionally aligned keys and signatures
//! - [`Fetter`]: A party's pre-signature declaration for a block
//! - [`Witness`]: A party's post-signature contribution
//! - [`BoundWitness`]: One ledger entry: aligned fetters and witnesses

pub mod bound_witness;
pub mod error;
pub mod hash;
pub mod key;

pub use bound_witness::{BoundWitness, Fetter, FetterItem, Party, Witness};
pub use error::TypeError;
pub use hash::Hash;
pub use key::{KeyAlgorithm, KeySet, PublicKey, Signature, SignatureSet};
