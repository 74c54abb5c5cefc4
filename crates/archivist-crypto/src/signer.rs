use archivist_types::{BoundWitness, KeyAlgorithm, PublicKey, Signature};

use crate::error::{CryptoError, CryptoResult};

/// A party able to sign block data under one public key.
pub trait Signer: Send + Sync {
    /// The key signatures from this signer verify under.
    fn public_key(&self) -> PublicKey;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> CryptoResult<Signature>;
}

/// Ed25519 signer.
pub struct Ed25519Signer(ed25519_dalek::SigningKey);

impl Ed25519Signer {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey::new(KeyAlgorithm::Ed25519, self.0.verifying_key().to_bytes().to_vec())
    }

    fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        use ed25519_dalek::Signer as _;
        let sig = self.0.sign(message);
        Ok(Signature::new(KeyAlgorithm::Ed25519, sig.to_bytes().to_vec()))
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer(<redacted>)")
    }
}

/// Verify one signature over `message` under `key`.
pub fn verify_signature(key: &PublicKey, message: &[u8], signature: &Signature) -> CryptoResult<()> {
    match key.algorithm() {
        KeyAlgorithm::Ed25519 => {
            use ed25519_dalek::Verifier;
            let key_bytes: [u8; 32] = key
                .key_bytes()
                .try_into()
                .map_err(|_| CryptoError::InvalidKey)?;
            let sig_bytes: [u8; 64] = signature
                .as_bytes()
                .try_into()
                .map_err(|_| CryptoError::InvalidSignature)?;
            let vk = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                .map_err(|_| CryptoError::InvalidKey)?;
            vk.verify(message, &ed25519_dalek::Signature::from_bytes(&sig_bytes))
                .map_err(|_| CryptoError::InvalidSignature)
        }
        other => Err(CryptoError::UnsupportedAlgorithm(other)),
    }
}

/// Verify every party's signature set against the block's signing data.
pub fn verify_bound_witness(block: &BoundWitness) -> CryptoResult<()> {
    let message = block.signing_data()?;
    for party in block.parties() {
        let keys = party.key_set().iter();
        for (index, (key, sig)) in keys.zip(party.witness.signature_set.iter()).enumerate() {
            verify_signature(key, &message, sig).map_err(|e| match e {
                CryptoError::UnsupportedAlgorithm(_) => e,
                _ => CryptoError::PartySignature {
                    position: party.position,
                    index,
                },
            })?;
        }
    }
    Ok(())
}
