use std::fmt;

use subtle::ConstantTimeEq;

/// Server-held admin credential.
///
/// Comparison hashes both sides first and compares the digests in constant
/// time, so neither content nor length of the secret leaks through timing.
/// An empty secret never matches anything.
#[derive(Clone)]
pub struct AdminSecret {
    digest: Option<[u8; 32]>,
}

impl AdminSecret {
    pub fn new(secret: impl AsRef<str>) -> Self {
        let secret = secret.as_ref();
        let digest = if secret.is_empty() {
            None
        } else {
            Some(Self::digest(secret))
        };
        Self { digest }
    }

    /// A secret that rejects every credential.
    pub fn disabled() -> Self {
        Self { digest: None }
    }

    /// Read the secret from an environment variable; unset or empty disables it.
    pub fn from_env(var: &str) -> Self {
        std::env::var(var).map(Self::new).unwrap_or_else(|_| Self::disabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    pub fn matches(&self, presented: &str) -> bool {
        let Some(expected) = self.digest else {
            return false;
        };
        let candidate = Self::digest(presented);
        expected.ct_eq(&candidate).into()
    }

    fn digest(value: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"coach-admin-secret-v1:");
        hasher.update(value.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSecret")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
