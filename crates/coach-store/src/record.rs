use chrono::{DateTime, Utc};
use coach_crypto::Digest;
use coach_types::{Account, AccountId, CreditPool, GrantResult, Platform};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value tagged with the store version it was read at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }
}

/// Everything the store keeps per account besides the journal itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account: Account,
    /// Balances at provisioning; journal replay starts here.
    pub opening: Account,
    pub created_at: DateTime<Utc>,
    pub journal_len: u64,
    pub journal_head: Option<Digest>,
}

impl AccountRecord {
    pub fn provisioned(opening: Account, created_at: DateTime<Utc>) -> Self {
        Self {
            account: opening.clone(),
            opening,
            created_at,
            journal_len: 0,
            journal_head: None,
        }
    }
}

/// One committed balance mutation.
///
/// `digest` covers every other field, and `prev_digest` links to the
/// previous entry of the same account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// 1-based position in the account journal.
    pub seq: u64,
    pub entry_id: Uuid,
    pub account_id: AccountId,
    pub pool: CreditPool,
    pub delta: i64,
    pub balance_after: u64,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    pub prev_digest: Option<Digest>,
    pub digest: Digest,
}

/// Idempotency record of an accepted purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub grant: GrantResult,
    pub product_id: String,
    pub platform: Platform,
}

/// An atomic write computed from the record at `expected_version`.
#[derive(Clone, Debug)]
pub struct Commit {
    pub account_id: AccountId,
    pub expected_version: u64,
    pub account: Account,
    pub entry: JournalEntry,
    pub purchase: Option<PurchaseRecord>,
}
