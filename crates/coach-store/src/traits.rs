use coach_types::{AccountId, TransactionId};

use crate::error::StoreResult;
use crate::record::{AccountRecord, Commit, JournalEntry, PurchaseRecord, Versioned};

/// Versioned account storage.
///
/// All implementations must satisfy these invariants:
/// - `commit` is all-or-nothing: the account, its journal entry and the
///   optional purchase record are written together or not at all.
/// - `commit` succeeds only if the stored version equals
///   `expected_version`; the new version is strictly greater.
/// - A purchase record for a given transaction id is written at most once;
///   a second attempt fails with `StoreError::PurchaseExists` carrying the
///   original record.
/// - A journal entry must extend the account journal: its `seq` is one past
///   the current length and its `prev_digest` equals the current head.
pub trait AccountStore: Send + Sync {
    /// Insert a freshly provisioned account at version 1.
    ///
    /// Fails with `StoreError::AccountExists` if the id is taken.
    fn create(&self, id: &AccountId, record: AccountRecord) -> StoreResult<Versioned<AccountRecord>>;

    /// Snapshot of an account record. `Ok(None)` if the account does not exist.
    fn load(&self, id: &AccountId) -> StoreResult<Option<Versioned<AccountRecord>>>;

    /// Apply a commit and return the new version.
    fn commit(&self, commit: Commit) -> StoreResult<u64>;

    /// Look up the purchase record of a transaction.
    fn purchase(&self, transaction: &TransactionId) -> StoreResult<Option<PurchaseRecord>>;

    /// Full journal of an account, oldest first.
    fn journal(&self, id: &AccountId) -> StoreResult<Vec<JournalEntry>>;

    /// All known account ids, sorted.
    fn account_ids(&self) -> StoreResult<Vec<AccountId>>;
}
