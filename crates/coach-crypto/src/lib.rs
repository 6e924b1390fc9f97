//! Cryptographic helpers for the coaching credit service.
//!
//! Provides domain-separated BLAKE3 hashing for the credit journal, hash
//! chain verification, and constant-time comparison of the admin secret.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod chain;
pub mod hasher;
pub mod secret;

pub use chain::{ChainError, ChainVerifier, Chained};
pub use hasher::{ContentHasher, Digest, HasherError};
pub use secret::AdminSecret;
