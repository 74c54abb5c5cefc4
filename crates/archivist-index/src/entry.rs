//! Per-key index records and their persisted encoding.
//!
//! Stored under `"public-keys." ++ canonical key bytes` as JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "hashes": ["<hex>", ...],
//!   "parentPublicKeyIndex": "<hex>" | null,
//!   "otherPublicKeys": ["<hex>", ...]
//! }
//! ```
//!
//! Records written before versioning (no `version` field) decode as version 1.

use archivist_types::{Hash, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

pub const KEY_PREFIX: &[u8] = b"public-keys.";

const RECORD_VERSION: u32 = 1;

/// Store key of `pk`'s entry.
pub fn entry_key(pk: &PublicKey) -> Vec<u8> {
    let mut key = KEY_PREFIX.to_vec();
    key.extend_from_slice(&pk.to_canonical_bytes());
    key
}

/// Printable form of [`entry_key`] for diagnostics.
pub fn entry_key_display(pk: &PublicKey) -> String {
    format!("public-keys.{}", pk.to_hex())
}

/// What the index knows about one public key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicKeyIndexEntry {
    /// Blocks co-signed with this key, in indexing order. Append-only.
    pub hashes: Vec<Hash>,
    /// Ultimate ancestor of this key's lineage, if it has one.
    pub parent: Option<PublicKey>,
    /// Keys known to descend from this one.
    pub siblings: Vec<PublicKey>,
}

impl PublicKeyIndexEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the hash was already recorded.
    pub fn add_hash(&mut self, hash: Hash) -> bool {
        if self.hashes.contains(&hash) {
            return false;
        }
        self.hashes.push(hash);
        true
    }

    /// Returns `false` if the key was already registered.
    pub fn add_sibling(&mut self, pk: PublicKey) -> bool {
        if self.siblings.contains(&pk) {
            return false;
        }
        self.siblings.push(pk);
        true
    }

    pub fn encode(&self) -> IndexResult<Vec<u8>> {
        let record = EntryRecord {
            version: RECORD_VERSION,
            hashes: self.hashes.iter().map(Hash::to_hex).collect(),
            parent_public_key_index: self.parent.as_ref().map(PublicKey::to_hex),
            other_public_keys: self.siblings.iter().map(PublicKey::to_hex).collect(),
        };
        serde_json::to_vec(&record).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    /// Decode the entry stored for `pk`. Any malformed field is corruption.
    pub fn decode(pk: &PublicKey, bytes: &[u8]) -> IndexResult<Self> {
        let corrupt = |reason: String| IndexError::CorruptEntry {
            key: entry_key_display(pk),
            reason,
        };

        let record: EntryRecord =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        if record.version != RECORD_VERSION {
            return Err(corrupt(format!("unsupported record version {}", record.version)));
        }

        let hashes = record
            .hashes
            .iter()
            .map(|h| Hash::from_hex(h))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt(format!("bad hash: {e}")))?;
        let parent = record
            .parent_public_key_index
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()
            .map_err(|e| corrupt(format!("bad parent key: {e}")))?;
        let siblings = record
            .other_public_keys
            .iter()
            .map(|k| PublicKey::from_hex(k))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt(format!("bad sibling key: {e}")))?;

        Ok(Self {
            hashes,
            parent,
            siblings,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    #[serde(default = "legacy_version")]
    version: u32,
    hashes: Vec<String>,
    parent_public_key_index: Option<String>,
    other_public_keys: Vec<String>,
}

fn legacy_version() -> u32 {
    1
}
