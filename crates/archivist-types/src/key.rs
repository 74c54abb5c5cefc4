use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Signature scheme a [`PublicKey`] or [`Signature`] belongs to.
///
/// The tag byte is the first byte of a key's canonical encoding, so two keys
/// with identical raw bytes under different schemes never compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1Sha256,
}

impl KeyAlgorithm {
    pub const fn tag(self) -> u8 {
        match self {
            Self::Ed25519 => 0x01,
            Self::Secp256k1Sha256 => 0x02,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            0x01 => Ok(Self::Ed25519),
            0x02 => Ok(Self::Secp256k1Sha256),
            other => Err(TypeError::UnknownAlgorithm(other)),
        }
    }
}

/// Serializable identity credential.
///
/// Equality, ordering, and hashing all follow the canonical byte form
/// (`[algorithm tag] ++ key bytes`), which is also what the lineage index
/// uses as its record key and graph node id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    key: Vec<u8>,
}

impl PublicKey {
    pub fn new(algorithm: KeyAlgorithm, key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            key: key.into(),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Raw key bytes without the algorithm tag.
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Canonical serialized form: algorithm tag followed by the key bytes.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.key.len());
        out.push(self.algorithm.tag());
        out.extend_from_slice(&self.key);
        out
    }

    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let (tag, key) = bytes.split_first().ok_or(TypeError::EmptyKey)?;
        Ok(Self {
            algorithm: KeyAlgorithm::from_tag(*tag)?,
            key: key.to_vec(),
        })
    }

    /// Hex of the canonical form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_canonical_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_canonical_bytes(&bytes)
    }

    /// Short identifier (first 8 hex characters of the raw key).
    pub fn short_id(&self) -> String {
        hex::encode(&self.key[..self.key.len().min(4)])
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({:?}:{})", self.algorithm, self.short_id())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Ordered set of public keys, one per key held by a co-signing party.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet(Vec<PublicKey>);

impl KeySet {
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self(keys)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PublicKey> {
        self.0.iter()
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.0.contains(key)
    }

    pub fn as_slice(&self) -> &[PublicKey] {
        &self.0
    }
}

impl FromIterator<PublicKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = PublicKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a PublicKey;
    type IntoIter = std::slice::Iter<'a, PublicKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A signature produced by one key over a block's signing data.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl Signature {
    pub fn new(algorithm: KeyAlgorithm, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            bytes: bytes.into(),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({}...)",
            hex::encode(&self.bytes[..self.bytes.len().min(8)])
        )
    }
}

/// Ordered signatures, positionally aligned with a party's [`KeySet`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet(Vec<Signature>);

impl SignatureSet {
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self(signatures)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.0.iter()
    }
}

impl FromIterator<Signature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
