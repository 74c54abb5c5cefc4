use archivist_types::Hash;

/// Pluggable digest provider used to derive block hashes.
pub trait HashProvider: Send + Sync {
    /// Hash raw bytes.
    fn hash(&self, data: &[u8]) -> Hash;

    /// Verify that data produces the expected hash.
    fn verify(&self, data: &[u8], expected: &Hash) -> bool {
        self.hash(data) == *expected
    }
}

/// Domain-separated BLAKE3 hash provider.
///
/// The domain tag is prepended to every hash computation so that digests
/// from different record families never collide.
#[derive(Clone, Copy, Debug)]
pub struct Blake3HashProvider {
    domain: &'static str,
}

impl Blake3HashProvider {
    /// Provider for bound witness block hashes.
    pub const BLOCK: Self = Self {
        domain: "archivist-block-v1",
    };

    /// Create a provider with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// The domain tag used by this provider.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

impl Default for Blake3HashProvider {
    fn default() -> Self {
        Self::BLOCK
    }
}

impl HashProvider for Blake3HashProvider {
    fn hash(&self, data: &[u8]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Hash::from_bytes(*hasher.finalize().as_bytes())
    }
}
