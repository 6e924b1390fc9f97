use std::collections::BTreeMap;
use std::sync::RwLock;

use coach_types::{AccountId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::{AccountRecord, Commit, JournalEntry, PurchaseRecord, Versioned};
use crate::traits::AccountStore;

/// The complete contents of a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    accounts: BTreeMap<AccountId, Versioned<AccountRecord>>,
    journals: BTreeMap<AccountId, Vec<JournalEntry>>,
    purchases: BTreeMap<TransactionId, PurchaseRecord>,
}

impl StoreState {
    pub(crate) fn create(
        &mut self,
        id: &AccountId,
        record: AccountRecord,
    ) -> StoreResult<Versioned<AccountRecord>> {
        if self.accounts.contains_key(id) {
            return Err(StoreError::AccountExists(id.clone()));
        }
        let versioned = Versioned::new(1, record);
        self.accounts.insert(id.clone(), versioned.clone());
        self.journals.insert(id.clone(), Vec::new());
        Ok(versioned)
    }

    /// Validate a commit against the current state, then apply it.
    ///
    /// Every check runs before the first write, so a failed commit leaves
    /// the state untouched.
    pub(crate) fn apply_commit(&mut self, commit: Commit) -> StoreResult<u64> {
        let Commit {
            account_id,
            expected_version,
            account,
            entry,
            purchase,
        } = commit;

        let current = self
            .accounts
            .get(&account_id)
            .ok_or_else(|| StoreError::AccountNotFound(account_id.clone()))?;

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                account: account_id,
                expected: expected_version,
                actual: current.version,
            });
        }

        if let Some(purchase) = &purchase {
            if let Some(existing) = self.purchases.get(&purchase.grant.transaction_id) {
                return Err(StoreError::PurchaseExists(Box::new(existing.clone())));
            }
        }

        if entry.account_id != account_id {
            return Err(StoreError::IntegrityViolation {
                account: account_id,
                reason: format!("journal entry belongs to {}", entry.account_id),
            });
        }
        let expected_seq = current.value.journal_len + 1;
        if entry.seq != expected_seq {
            return Err(StoreError::IntegrityViolation {
                account: account_id,
                reason: format!("expected journal seq {expected_seq}, found {}", entry.seq),
            });
        }
        if entry.prev_digest != current.value.journal_head {
            return Err(StoreError::IntegrityViolation {
                account: account_id,
                reason: "journal entry does not extend the current head".into(),
            });
        }

        let new_version = current.version + 1;
        let mut record = current.value.clone();
        record.account = account;
        record.journal_len = entry.seq;
        record.journal_head = Some(entry.digest);

        self.accounts
            .insert(account_id.clone(), Versioned::new(new_version, record));
        self.journals.entry(account_id).or_default().push(entry);
        if let Some(purchase) = purchase {
            self.purchases
                .insert(purchase.grant.transaction_id.clone(), purchase);
        }

        Ok(new_version)
    }

    pub(crate) fn load(&self, id: &AccountId) -> Option<Versioned<AccountRecord>> {
        self.accounts.get(id).cloned()
    }

    pub(crate) fn purchase(&self, transaction: &TransactionId) -> Option<PurchaseRecord> {
        self.purchases.get(transaction).cloned()
    }

    pub(crate) fn journal(&self, id: &AccountId) -> StoreResult<Vec<JournalEntry>> {
        if !self.accounts.contains_key(id) {
            return Err(StoreError::AccountNotFound(id.clone()));
        }
        Ok(self.journals.get(id).cloned().unwrap_or_default())
    }

    pub(crate) fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.keys().cloned().collect()
    }

    pub(crate) fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

/// In-memory account store.
///
/// Intended for tests and embedding. All state sits behind one `RwLock`;
/// a commit holds the write lock only for validation and apply.
pub struct InMemoryAccountStore {
    state: RwLock<StoreState>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of provisioned accounts.
    pub fn len(&self) -> usize {
        self.read(|state| Ok(state.account_count())).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&StoreState) -> StoreResult<R>) -> StoreResult<R> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        f(&state)
    }

    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut state)
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create(&self, id: &AccountId, record: AccountRecord) -> StoreResult<Versioned<AccountRecord>> {
        self.write(|state| state.create(id, record))
    }

    fn load(&self, id: &AccountId) -> StoreResult<Option<Versioned<AccountRecord>>> {
        self.read(|state| Ok(state.load(id)))
    }

    fn commit(&self, commit: Commit) -> StoreResult<u64> {
        self.write(|state| state.apply_commit(commit))
    }

    fn purchase(&self, transaction: &TransactionId) -> StoreResult<Option<PurchaseRecord>> {
        self.read(|state| Ok(state.purchase(transaction)))
    }

    fn journal(&self, id: &AccountId) -> StoreResult<Vec<JournalEntry>> {
        self.read(|state| state.journal(id))
    }

    fn account_ids(&self) -> StoreResult<Vec<AccountId>> {
        self.read(|state| Ok(state.account_ids()))
    }
}

impl std::fmt::Debug for InMemoryAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAccountStore")
            .field("account_count", &self.len())
            .finish()
    }
}
