use crate::hasher::{ContentHasher, Digest};

/// An item that participates in a hash chain.
pub trait Chained {
    /// The item's own digest.
    fn digest(&self) -> Digest;
    /// Digest of the preceding item, `None` for the first one.
    fn prev_digest(&self) -> Option<Digest>;
    /// Canonical bytes the digest is computed over (own digest excluded).
    fn payload_bytes(&self) -> Vec<u8>;
}

/// Hash chain integrity verifier.
///
/// Checks that each item links to its predecessor and that each stored
/// digest matches its recomputed payload hash.
pub struct ChainVerifier {
    hasher: ContentHasher,
}

impl ChainVerifier {
    pub const fn new(hasher: ContentHasher) -> Self {
        Self { hasher }
    }

    pub fn verify(&self, items: &[impl Chained]) -> Result<(), ChainError> {
        let mut previous: Option<Digest> = None;
        for (index, item) in items.iter().enumerate() {
            match (previous, item.prev_digest()) {
                (None, Some(_)) => return Err(ChainError::GenesisHasPrevDigest),
                (Some(_), None) => return Err(ChainError::MissingPrevDigest { index }),
                (Some(expected), Some(actual)) if expected != actual => {
                    return Err(ChainError::BrokenLink { index })
                }
                _ => {}
            }

            if self.hasher.hash(&item.payload_bytes()) != item.digest() {
                return Err(ChainError::DigestMismatch { index });
            }
            previous = Some(item.digest());
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("first item carries a previous digest")]
    GenesisHasPrevDigest,

    #[error("broken link at index {index}: previous digest does not match")]
    BrokenLink { index: usize },

    #[error("missing previous digest at index {index}")]
    MissingPrevDigest { index: usize },

    #[error("digest mismatch at index {index}")]
    DigestMismatch { index: usize },
}
