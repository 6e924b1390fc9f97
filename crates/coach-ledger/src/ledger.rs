use std::sync::Arc;

use chrono::{DateTime, Utc};
use coach_store::{AccountRecord, AccountStore, Commit, JournalEntry, PurchaseRecord, StoreError};
use coach_types::{
    Account, AccountId, CreditPool, EntitlementType, GrantResult, Platform, SharedClock,
    Subscription, SubscriptionStatus, SystemClock, TransactionId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::{self, JournalReport};

/// Read view of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub free_credits: u64,
    pub paid_credits: u64,
    pub total_credits: u64,
    pub is_premium: bool,
    pub subscription: Option<Subscription>,
    pub version: u64,
    pub journal_len: u64,
    pub created_at: DateTime<Utc>,
}

/// Where a consumed credit came from and what is left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub pool: CreditPool,
    pub remaining: u64,
}

/// A verified purchase ready to be credited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseGrant {
    pub account_id: AccountId,
    pub transaction_id: TransactionId,
    pub product_id: String,
    pub platform: Platform,
    pub entitlement_type: EntitlementType,
    pub credit_amount: u64,
    pub accepted_at: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
}

/// Outcome of [`CreditLedger::grant_purchase`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseCommit {
    /// The grant was applied by this call.
    Applied(GrantResult),
    /// The transaction had been applied before; nothing changed.
    AlreadyApplied(GrantResult),
}

impl PurchaseCommit {
    pub fn grant(&self) -> &GrantResult {
        match self {
            Self::Applied(grant) | Self::AlreadyApplied(grant) => grant,
        }
    }

    pub fn into_grant(self) -> GrantResult {
        match self {
            Self::Applied(grant) | Self::AlreadyApplied(grant) => grant,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::AlreadyApplied(_))
    }
}

/// One computed mutation, committed as a unit.
struct Plan {
    account: Account,
    pool: CreditPool,
    delta: i64,
    reason: String,
    purchase: Option<PurchaseRecord>,
}

/// The credit ledger.
///
/// Stateless apart from its handles; every call is an independent unit of
/// work against the shared store.
pub struct CreditLedger {
    store: Arc<dyn AccountStore>,
    clock: SharedClock,
    config: LedgerConfig,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn AccountStore>, clock: SharedClock, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Ledger over `store` with the system clock and default retry settings.
    pub fn with_store(store: Arc<dyn AccountStore>) -> Self {
        Self::new(store, Arc::new(SystemClock), LedgerConfig::default())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Create an account holding `free_credits` promotional credits.
    pub fn provision_account(
        &self,
        account_id: &AccountId,
        free_credits: u64,
    ) -> LedgerResult<AccountSnapshot> {
        let record = AccountRecord::provisioned(
            Account::with_free_credits(free_credits),
            self.clock.now(),
        );
        let created = self.store.create(account_id, record).map_err(|e| match e {
            StoreError::AccountExists(id) => LedgerError::AccountExists(id),
            other => other.into(),
        })?;
        info!(account = %account_id, free_credits, "account provisioned");
        Ok(self.snapshot(account_id, created.version, &created.value))
    }

    pub fn account(&self, account_id: &AccountId) -> LedgerResult<AccountSnapshot> {
        let record = self
            .store
            .load(account_id)?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
        Ok(self.snapshot(account_id, record.version, &record.value))
    }

    /// Apply a signed delta to one pool and return that pool's new balance.
    ///
    /// A negative delta larger than the balance fails; it is never clamped.
    pub fn adjust_balance(
        &self,
        account_id: &AccountId,
        pool: CreditPool,
        delta: i64,
        reason: &str,
    ) -> LedgerResult<u64> {
        let plan = self.transact(account_id, |record| {
            let mut account = record.account.clone();
            let balance = apply_delta(account_id, &account, pool, delta)?;
            account.set_balance(pool, balance);
            Ok(Plan {
                account,
                pool,
                delta,
                reason: reason.to_string(),
                purchase: None,
            })
        })?;

        let balance = plan.account.balance(pool);
        info!(account = %account_id, %pool, delta, balance, reason, "balance adjusted");
        Ok(balance)
    }

    /// Spend one credit, from the free pool while it lasts, then from paid.
    pub fn consume_credit(&self, account_id: &AccountId, reason: &str) -> LedgerResult<Consumption> {
        let plan = self.transact(account_id, |record| {
            let mut account = record.account.clone();
            let pool = if account.free_credits >= 1 {
                CreditPool::Free
            } else {
                CreditPool::Paid
            };
            let balance = apply_delta(account_id, &account, pool, -1)?;
            account.set_balance(pool, balance);
            Ok(Plan {
                account,
                pool,
                delta: -1,
                reason: reason.to_string(),
                purchase: None,
            })
        })?;

        let consumption = Consumption {
            pool: plan.pool,
            remaining: plan.account.total(),
        };
        info!(
            account = %account_id,
            pool = %consumption.pool,
            remaining = consumption.remaining,
            reason,
            "credit consumed"
        );
        Ok(consumption)
    }

    /// Credit a verified purchase to the paid pool, at most once per transaction.
    ///
    /// The purchase record and the balance change commit together, so two
    /// racing submissions of one transaction cannot both grant.
    pub fn grant_purchase(&self, grant: &PurchaseGrant) -> LedgerResult<PurchaseCommit> {
        if let Some(existing) = self.store.purchase(&grant.transaction_id)? {
            return self.replay(grant, existing);
        }

        let delta = i64::try_from(grant.credit_amount).map_err(|_| LedgerError::BalanceOverflow {
            account: grant.account_id.clone(),
            pool: CreditPool::Paid,
        })?;
        let reason = format!("purchase:{}", grant.transaction_id);

        let result = self.transact(&grant.account_id, |record| {
            let mut account = record.account.clone();
            let balance = apply_delta(&grant.account_id, &account, CreditPool::Paid, delta)?;
            account.set_balance(CreditPool::Paid, balance);

            if let (EntitlementType::Subscription, Some(expires_at)) =
                (grant.entitlement_type, grant.expiry)
            {
                account.subscription = Some(Subscription {
                    product_id: grant.product_id.clone(),
                    platform: grant.platform,
                    status: SubscriptionStatus::Active,
                    expires_at,
                });
            }

            let purchase = PurchaseRecord {
                grant: GrantResult {
                    accepted: true,
                    account_id: grant.account_id.clone(),
                    transaction_id: grant.transaction_id.clone(),
                    entitlement_type: grant.entitlement_type,
                    credit_amount: grant.credit_amount,
                    expiry: grant.expiry,
                    new_balance: balance,
                    accepted_at: grant.accepted_at,
                },
                product_id: grant.product_id.clone(),
                platform: grant.platform,
            };

            Ok(Plan {
                account,
                pool: CreditPool::Paid,
                delta,
                reason: reason.clone(),
                purchase: Some(purchase),
            })
        });

        match result {
            Ok(plan) => {
                let purchase = plan.purchase.ok_or_else(|| LedgerError::JournalCorrupted {
                    account: grant.account_id.clone(),
                    reason: "committed purchase plan lost its record".into(),
                })?;
                info!(
                    account = %grant.account_id,
                    transaction = %grant.transaction_id,
                    entitlement = %grant.entitlement_type,
                    credits = grant.credit_amount,
                    balance = purchase.grant.new_balance,
                    "purchase granted"
                );
                Ok(PurchaseCommit::Applied(purchase.grant))
            }
            Err(LedgerError::Store(StoreError::PurchaseExists(existing))) => {
                self.replay(grant, *existing)
            }
            Err(other) => Err(other),
        }
    }

    /// Every account id in the store, sorted.
    pub fn account_ids(&self) -> LedgerResult<Vec<AccountId>> {
        Ok(self.store.account_ids()?)
    }

    pub fn journal(&self, account_id: &AccountId) -> LedgerResult<Vec<JournalEntry>> {
        self.store.journal(account_id).map_err(|e| match e {
            StoreError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
            other => other.into(),
        })
    }

    /// Verify the journal chain and reconcile it against the stored balances.
    pub fn verify_journal(&self, account_id: &AccountId) -> LedgerResult<JournalReport> {
        let record = self
            .store
            .load(account_id)?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
        let entries = self.journal(account_id)?;

        journal::verify(account_id, &record.value, &entries).map_err(|reason| {
            warn!(account = %account_id, %reason, "journal verification failed");
            LedgerError::JournalCorrupted {
                account: account_id.clone(),
                reason,
            }
        })
    }

    fn replay(&self, grant: &PurchaseGrant, existing: PurchaseRecord) -> LedgerResult<PurchaseCommit> {
        if existing.grant.account_id != grant.account_id {
            warn!(
                account = %grant.account_id,
                transaction = %grant.transaction_id,
                "transaction already granted to another account"
            );
            return Err(LedgerError::TransactionClaimed {
                transaction: grant.transaction_id.clone(),
            });
        }
        info!(
            account = %grant.account_id,
            transaction = %grant.transaction_id,
            "duplicate transaction, returning earlier grant"
        );
        Ok(PurchaseCommit::AlreadyApplied(existing.grant))
    }

    /// Optimistic read-modify-write with bounded retry.
    ///
    /// `plan` must be a pure function of the record it is given; it is
    /// re-run against a fresh snapshot after every conflict. Errors from
    /// `plan` are returned immediately.
    fn transact(
        &self,
        account_id: &AccountId,
        plan: impl Fn(&AccountRecord) -> LedgerResult<Plan>,
    ) -> LedgerResult<Plan> {
        let attempts = self.config.attempts();

        for attempt in 1..=attempts {
            let snapshot = self
                .store
                .load(account_id)?
                .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;

            let planned = plan(&snapshot.value)?;
            let balance_after = planned.account.balance(planned.pool);
            let entry = journal::next_entry(
                &snapshot.value,
                account_id,
                planned.pool,
                planned.delta,
                balance_after,
                &planned.reason,
                self.clock.now(),
            )?;

            let commit = Commit {
                account_id: account_id.clone(),
                expected_version: snapshot.version,
                account: planned.account.clone(),
                entry,
                purchase: planned.purchase.clone(),
            };

            match self.store.commit(commit) {
                Ok(version) => {
                    debug!(account = %account_id, version, attempt, "commit applied");
                    return Ok(planned);
                }
                Err(StoreError::VersionConflict { expected, actual, .. }) => {
                    debug!(account = %account_id, expected, actual, attempt, "version conflict, retrying");
                    if attempt < attempts {
                        self.config.pause(attempt);
                    }
                }
                Err(StoreError::AccountNotFound(id)) => return Err(LedgerError::AccountNotFound(id)),
                Err(other) => return Err(other.into()),
            }
        }

        warn!(account = %account_id, attempts, "giving up after repeated version conflicts");
        Err(LedgerError::TransactionConflict {
            account: account_id.clone(),
            attempts,
        })
    }

    fn snapshot(&self, account_id: &AccountId, version: u64, record: &AccountRecord) -> AccountSnapshot {
        let account = &record.account;
        AccountSnapshot {
            account_id: account_id.clone(),
            free_credits: account.free_credits,
            paid_credits: account.paid_credits,
            total_credits: account.total(),
            is_premium: account.is_premium(self.clock.now()),
            subscription: account.subscription.clone(),
            version,
            journal_len: record.journal_len,
            created_at: record.created_at,
        }
    }
}

/// New balance of `pool` after `delta`, or the reason it cannot be applied.
fn apply_delta(
    account_id: &AccountId,
    account: &Account,
    pool: CreditPool,
    delta: i64,
) -> LedgerResult<u64> {
    let balance = account.balance(pool);
    if delta >= 0 {
        balance
            .checked_add(delta.unsigned_abs())
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: account_id.clone(),
                pool,
            })
    } else {
        balance
            .checked_sub(delta.unsigned_abs())
            .ok_or_else(|| LedgerError::InsufficientBalance {
                account: account_id.clone(),
                pool,
                balance,
                delta,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;

    use chrono::{Duration, TimeZone};
    use coach_store::{InMemoryAccountStore, StoreResult, Versioned};
    use coach_types::{ErrorKind, ManualClock};
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn ledger_with(store: Arc<dyn AccountStore>, config: LedgerConfig) -> CreditLedger {
        CreditLedger::new(store, Arc::new(ManualClock::new(start())), config)
    }

    fn ledger() -> CreditLedger {
        ledger_with(Arc::new(InMemoryAccountStore::new()), LedgerConfig::default())
    }

    fn grant(account: &str, txn: &str, entitlement: EntitlementType, credits: u64) -> PurchaseGrant {
        PurchaseGrant {
            account_id: id(account),
            transaction_id: TransactionId::new(txn).unwrap(),
            product_id: "p1".into(),
            platform: Platform::Android,
            entitlement_type: entitlement,
            credit_amount: credits,
            accepted_at: start(),
            expiry: entitlement.expiry_from(start()),
        }
    }

    /// Store wrapper that reports a conflict for the first `conflicts` commits.
    struct ContendedStore {
        inner: InMemoryAccountStore,
        conflicts: u32,
        commits: AtomicU32,
    }

    impl ContendedStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryAccountStore::new(),
                conflicts,
                commits: AtomicU32::new(0),
            }
        }
    }

    impl AccountStore for ContendedStore {
        fn create(&self, id: &AccountId, record: AccountRecord) -> StoreResult<Versioned<AccountRecord>> {
            self.inner.create(id, record)
        }
        fn load(&self, id: &AccountId) -> StoreResult<Option<Versioned<AccountRecord>>> {
            self.inner.load(id)
        }
        fn commit(&self, commit: Commit) -> StoreResult<u64> {
            let n = self.commits.fetch_add(1, Ordering::SeqCst);
            if n < self.conflicts {
                return Err(StoreError::VersionConflict {
                    account: commit.account_id,
                    expected: commit.expected_version,
                    actual: commit.expected_version + 1,
                });
            }
            self.inner.commit(commit)
        }
        fn purchase(&self, transaction: &TransactionId) -> StoreResult<Option<PurchaseRecord>> {
            self.inner.purchase(transaction)
        }
        fn journal(&self, id: &AccountId) -> StoreResult<Vec<JournalEntry>> {
            self.inner.journal(id)
        }
        fn account_ids(&self) -> StoreResult<Vec<AccountId>> {
            self.inner.account_ids()
        }
    }

    #[test]
    fn provision_then_read() {
        let ledger = ledger();
        let created = ledger.provision_account(&id("u1"), 3).unwrap();
        assert_eq!(created.free_credits, 3);
        assert_eq!(created.paid_credits, 0);
        assert_eq!(created.version, 1);
        assert!(!created.is_premium);

        let error = ledger.provision_account(&id("u1"), 3).unwrap_err();
        assert!(matches!(error, LedgerError::AccountExists(_)));
    }

    #[test]
    fn adjust_returns_new_pool_balance() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 2).unwrap();

        assert_eq!(ledger.adjust_balance(&u1, CreditPool::Paid, 30, "admin").unwrap(), 30);
        assert_eq!(ledger.adjust_balance(&u1, CreditPool::Free, 5, "admin").unwrap(), 7);
        assert_eq!(ledger.adjust_balance(&u1, CreditPool::Paid, -10, "admin").unwrap(), 20);

        let account = ledger.account(&u1).unwrap();
        assert_eq!((account.free_credits, account.paid_credits), (7, 20));
        assert_eq!(account.journal_len, 3);
    }

    #[test]
    fn underflow_fails_and_leaves_balance() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 4).unwrap();

        let error = ledger.adjust_balance(&u1, CreditPool::Free, -5, "spend").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(ledger.account(&u1).unwrap().free_credits, 4);
        assert_eq!(ledger.account(&u1).unwrap().journal_len, 0);
    }

    #[test]
    fn unknown_account_is_reported() {
        let ledger = ledger();
        let error = ledger
            .adjust_balance(&id("ghost"), CreditPool::Paid, 1, "admin")
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AccountNotFound);
        assert_eq!(ledger.account(&id("ghost")).unwrap_err().kind(), ErrorKind::AccountNotFound);
    }

    #[test]
    fn consume_prefers_free_credits() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 1).unwrap();
        ledger.adjust_balance(&u1, CreditPool::Paid, 1, "admin").unwrap();

        let first = ledger.consume_credit(&u1, "analysis").unwrap();
        assert_eq!(first, Consumption { pool: CreditPool::Free, remaining: 1 });

        let second = ledger.consume_credit(&u1, "analysis").unwrap();
        assert_eq!(second, Consumption { pool: CreditPool::Paid, remaining: 0 });

        let error = ledger.consume_credit(&u1, "analysis").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InsufficientBalance);
    }

    #[test]
    fn purchase_grant_is_idempotent() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();

        let g = grant("u1", "t1", EntitlementType::Consumable, 50);
        let first = ledger.grant_purchase(&g).unwrap();
        assert!(!first.is_replay());
        assert_eq!(first.grant().new_balance, 50);
        assert_eq!(first.grant().expiry, None);

        let second = ledger.grant_purchase(&g).unwrap();
        assert!(second.is_replay());
        assert_eq!(second.grant(), first.grant());
        assert_eq!(ledger.account(&u1).unwrap().paid_credits, 50);
        assert_eq!(ledger.journal(&u1).unwrap().len(), 1);
        assert_eq!(ledger.journal(&u1).unwrap()[0].reason, "purchase:t1");
    }

    #[test]
    fn subscription_grant_records_entitlement() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();

        let commit = ledger
            .grant_purchase(&grant("u1", "sub-1", EntitlementType::Subscription, 100))
            .unwrap();
        assert_eq!(commit.grant().expiry, Some(start() + Duration::days(30)));

        let account = ledger.account(&u1).unwrap();
        assert!(account.is_premium);
        assert_eq!(account.paid_credits, 100);
        let sub = account.subscription.unwrap();
        assert_eq!(sub.expires_at, start() + Duration::days(30));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn transaction_cannot_move_between_accounts() {
        let ledger = ledger();
        ledger.provision_account(&id("u1"), 0).unwrap();
        ledger.provision_account(&id("u2"), 0).unwrap();

        ledger
            .grant_purchase(&grant("u1", "t1", EntitlementType::Consumable, 10))
            .unwrap();
        let error = ledger
            .grant_purchase(&grant("u2", "t1", EntitlementType::Consumable, 10))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::VerificationFailed);
        assert_eq!(ledger.account(&id("u2")).unwrap().paid_credits, 0);
    }

    #[test]
    fn transient_conflicts_are_retried() {
        let store = Arc::new(ContendedStore::new(3));
        let ledger = ledger_with(store.clone(), LedgerConfig::default());
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();

        assert_eq!(ledger.adjust_balance(&u1, CreditPool::Paid, 5, "admin").unwrap(), 5);
        assert_eq!(store.commits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn persistent_conflict_surfaces_after_bound() {
        let store = Arc::new(ContendedStore::new(u32::MAX));
        let ledger = ledger_with(store.clone(), LedgerConfig::default());
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();

        let error = ledger.adjust_balance(&u1, CreditPool::Paid, 5, "admin").unwrap_err();
        assert!(matches!(error, LedgerError::TransactionConflict { attempts: 4, .. }));
        assert_eq!(error.kind(), ErrorKind::TransactionConflict);
        assert_eq!(store.commits.load(Ordering::SeqCst), 4);
        assert_eq!(ledger.account(&u1).unwrap().paid_credits, 0);
    }

    #[test]
    fn concurrent_grants_are_never_lost() {
        const CALLERS: usize = 50;
        let store: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
        let ledger = ledger_with(
            store,
            LedgerConfig {
                max_attempts: 1_000,
                backoff_ms: 0,
            },
        );
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();
        ledger.adjust_balance(&u1, CreditPool::Paid, 7, "seed").unwrap();

        let barrier = Barrier::new(CALLERS);
        std::thread::scope(|scope| {
            for _ in 0..CALLERS {
                scope.spawn(|| {
                    barrier.wait();
                    ledger.adjust_balance(&u1, CreditPool::Paid, 1, "concurrent").unwrap();
                });
            }
        });

        assert_eq!(ledger.account(&u1).unwrap().paid_credits, 7 + CALLERS as u64);
        assert_eq!(ledger.journal(&u1).unwrap().len(), CALLERS + 1);
        ledger.verify_journal(&u1).unwrap();
    }

    #[test]
    fn racing_duplicate_purchases_grant_once() {
        const CALLERS: usize = 16;
        let ledger = ledger_with(
            Arc::new(InMemoryAccountStore::new()),
            LedgerConfig {
                max_attempts: 1_000,
                backoff_ms: 0,
            },
        );
        let u1 = id("u1");
        ledger.provision_account(&u1, 0).unwrap();
        let g = grant("u1", "t-race", EntitlementType::Consumable, 25);

        let barrier = Barrier::new(CALLERS);
        let applied = AtomicU32::new(0);
        std::thread::scope(|scope| {
            for _ in 0..CALLERS {
                scope.spawn(|| {
                    barrier.wait();
                    let commit = ledger.grant_purchase(&g).unwrap();
                    assert_eq!(commit.grant().new_balance, 25);
                    if !commit.is_replay() {
                        applied.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.account(&u1).unwrap().paid_credits, 25);
    }

    #[test]
    fn journal_reconciles_after_mixed_activity() {
        let ledger = ledger();
        let u1 = id("u1");
        ledger.provision_account(&u1, 3).unwrap();
        ledger.adjust_balance(&u1, CreditPool::Paid, 20, "admin").unwrap();
        ledger.consume_credit(&u1, "analysis").unwrap();
        ledger
            .grant_purchase(&grant("u1", "t9", EntitlementType::Consumable, 40))
            .unwrap();

        let report = ledger.verify_journal(&u1).unwrap();
        assert_eq!(ledger.account_ids().unwrap(), vec![u1.clone()]);
        assert_eq!(report.entries, 3);
        assert_eq!(report.free_credits, 2);
        assert_eq!(report.paid_credits, 60);
    }

    proptest! {
        #[test]
        fn grant_then_spend_is_identity(opening in 0u64..1_000, paid in 0i64..1_000, d in 0i64..1_000, free_pool in any::<bool>()) {
            let ledger = ledger();
            let u1 = id("u1");
            let pool = if free_pool { CreditPool::Free } else { CreditPool::Paid };
            ledger.provision_account(&u1, opening).unwrap();
            ledger.adjust_balance(&u1, CreditPool::Paid, paid, "seed").unwrap();
            let before = ledger.account(&u1).unwrap();

            ledger.adjust_balance(&u1, pool, d, "grant").unwrap();
            ledger.adjust_balance(&u1, pool, -d, "spend").unwrap();

            let after = ledger.account(&u1).unwrap();
            prop_assert_eq!(before.free_credits, after.free_credits);
            prop_assert_eq!(before.paid_credits, after.paid_credits);
        }

        #[test]
        fn overspend_by_one_always_fails(opening in 0u64..10_000, free_pool in any::<bool>()) {
            let ledger = ledger();
            let u1 = id("u1");
            let pool = if free_pool { CreditPool::Free } else { CreditPool::Paid };
            ledger.provision_account(&u1, 0).unwrap();
            ledger.adjust_balance(&u1, pool, opening as i64, "seed").unwrap();

            let error = ledger.adjust_balance(&u1, pool, -(opening as i64 + 1), "spend").unwrap_err();
            prop_assert_eq!(error.kind(), ErrorKind::InsufficientBalance);

            let account = ledger.account(&u1).unwrap();
            let balance = match pool {
                CreditPool::Free => account.free_credits,
                CreditPool::Paid => account.paid_credits,
            };
            prop_assert_eq!(balance, opening);
        }
    }
}
