//! Bound witness records: fetters, witnesses, and the aligned ledger entry.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::Hash;
use crate::key::{KeySet, PublicKey, SignatureSet};

/// A typed payload item carried in a party's [`Fetter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetterItem {
    /// The party's sequence index within its own origin chain.
    Index(u64),
    /// Pointer to the prior block this party extends.
    PreviousHash(Hash),
    /// Announces the key this party will use after rotating.
    NextPublicKey(PublicKey),
    /// Opaque application payload.
    Data(Vec<u8>),
}

/// A party's pre-signature declaration for one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fetter {
    pub key_set: KeySet,
    pub items: Vec<FetterItem>,
}

impl Fetter {
    pub fn new(key_set: KeySet, items: Vec<FetterItem>) -> Self {
        Self { key_set, items }
    }

    /// The first sequence index item, if any.
    pub fn index(&self) -> Option<u64> {
        self.items.iter().find_map(|item| match item {
            FetterItem::Index(i) => Some(*i),
            _ => None,
        })
    }

    /// The first previous-hash item, if any.
    pub fn previous_hash(&self) -> Option<Hash> {
        self.items.iter().find_map(|item| match item {
            FetterItem::PreviousHash(h) => Some(*h),
            _ => None,
        })
    }

    /// Every key announced through next-public-key items.
    pub fn next_public_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.items.iter().filter_map(|item| match item {
            FetterItem::NextPublicKey(pk) => Some(pk),
            _ => None,
        })
    }

    /// Canonical bytes of this fetter. These are the bytes each party signs.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// A party's post-signature contribution for one block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub signature_set: SignatureSet,
    pub unsigned_payload: Vec<Vec<u8>>,
}

impl Witness {
    pub fn new(signature_set: SignatureSet, unsigned_payload: Vec<Vec<u8>>) -> Self {
        Self {
            signature_set,
            unsigned_payload,
        }
    }
}

/// One party's aligned view of a bound witness.
#[derive(Clone, Copy, Debug)]
pub struct Party<'a> {
    pub position: usize,
    pub fetter: &'a Fetter,
    pub witness: &'a Witness,
}

impl Party<'_> {
    pub fn key_set(&self) -> &KeySet {
        &self.fetter.key_set
    }
}

/// One ledger entry: a fetter and a witness per co-signing party.
///
/// Construction enforces `fetters.len() == witnesses.len()` and that every
/// party's signature set is as long as its key set, so a positional index
/// always aligns a party's fetter, witness, and keys. Deserialization goes
/// through the same check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundWitness", into = "RawBoundWitness")]
pub struct BoundWitness {
    fetters: Vec<Fetter>,
    witnesses: Vec<Witness>,
}

#[derive(Serialize, Deserialize)]
struct RawBoundWitness {
    fetters: Vec<Fetter>,
    witnesses: Vec<Witness>,
}

impl TryFrom<RawBoundWitness> for BoundWitness {
    type Error = TypeError;

    fn try_from(raw: RawBoundWitness) -> Result<Self, Self::Error> {
        Self::new(raw.fetters, raw.witnesses)
    }
}

impl From<BoundWitness> for RawBoundWitness {
    fn from(bw: BoundWitness) -> Self {
        Self {
            fetters: bw.fetters,
            witnesses: bw.witnesses,
        }
    }
}

impl BoundWitness {
    pub fn new(fetters: Vec<Fetter>, witnesses: Vec<Witness>) -> Result<Self, TypeError> {
        if fetters.is_empty() {
            return Err(TypeError::NoParties);
        }
        if fetters.len() != witnesses.len() {
            return Err(TypeError::MisalignedParties {
                fetters: fetters.len(),
                witnesses: witnesses.len(),
            });
        }
        for (position, (fetter, witness)) in fetters.iter().zip(&witnesses).enumerate() {
            if fetter.key_set.len() != witness.signature_set.len() {
                return Err(TypeError::MisalignedSignatures {
                    position,
                    keys: fetter.key_set.len(),
                    signatures: witness.signature_set.len(),
                });
            }
        }
        Ok(Self { fetters, witnesses })
    }

    pub fn fetters(&self) -> &[Fetter] {
        &self.fetters
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    pub fn party_count(&self) -> usize {
        self.fetters.len()
    }

    pub fn parties(&self) -> impl Iterator<Item = Party<'_>> {
        self.fetters
            .iter()
            .zip(&self.witnesses)
            .enumerate()
            .map(|(position, (fetter, witness))| Party {
                position,
                fetter,
                witness,
            })
    }

    pub fn key_sets(&self) -> impl Iterator<Item = &KeySet> {
        self.fetters.iter().map(|f| &f.key_set)
    }

    /// Whether any party's key set contains `key`.
    pub fn contains_public_key(&self, key: &PublicKey) -> bool {
        self.key_sets().any(|set| set.contains(key))
    }

    /// The bytes every party signs: each fetter's canonical bytes in order.
    ///
    /// For a single-party block this equals that fetter's bytes.
    pub fn signing_data(&self) -> Result<Vec<u8>, TypeError> {
        let mut out = Vec::new();
        for fetter in &self.fetters {
            out.extend(fetter.to_bytes()?);
        }
        Ok(out)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        bincode::deserialize(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
