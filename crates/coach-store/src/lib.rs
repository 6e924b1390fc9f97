//! Versioned account storage for the coaching credit service.
//!
//! The store is the only shared mutable resource in the system. It keeps
//! one versioned record per account, an append-only journal per account,
//! and the idempotency records of accepted purchases.
//!
//! # Design Rules
//!
//! 1. Reads return a snapshot tagged with the record version.
//! 2. A [`Commit`] names the version it was computed from; if the record
//!    has moved on, the commit fails with [`StoreError::VersionConflict`]
//!    and nothing is written.
//! 3. The account update, its journal entry and an optional purchase record
//!    land together or not at all.
//! 4. A purchase record is keyed by transaction id and can only be written once.
//!
//! # Storage Backends
//!
//! - [`InMemoryAccountStore`]: `BTreeMap`-backed store for tests and embedding
//! - [`FileAccountStore`]: the in-memory store plus an atomic JSON snapshot
//!   rewritten after every commit

pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileAccountStore;
pub use memory::InMemoryAccountStore;
pub use record::{AccountRecord, Commit, JournalEntry, PurchaseRecord, Versioned};
pub use traits::AccountStore;
