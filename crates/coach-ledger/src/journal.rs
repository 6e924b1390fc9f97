use chrono::{DateTime, Utc};
use coach_crypto::{ChainVerifier, Chained, ContentHasher, Digest, HasherError};
use coach_store::{AccountRecord, JournalEntry};
use coach_types::{AccountId, CreditPool};
use serde::Serialize;
use uuid::Uuid;

const JOURNAL_CHAIN: ChainVerifier = ChainVerifier::new(ContentHasher::JOURNAL_ENTRY);

/// Result of a successful journal verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalReport {
    pub account_id: AccountId,
    pub entries: u64,
    pub head: Option<Digest>,
    pub free_credits: u64,
    pub paid_credits: u64,
}

/// Canonical bytes of an entry: its JSON encoding with the digest zeroed.
fn canonical_bytes(entry: &JournalEntry) -> Result<Vec<u8>, HasherError> {
    let mut canonical = entry.clone();
    canonical.digest = Digest::ZERO;
    serde_json::to_vec(&canonical).map_err(|e| HasherError::Serialization(e.to_string()))
}

struct Link<'a>(&'a JournalEntry);

impl Chained for Link<'_> {
    fn digest(&self) -> Digest {
        self.0.digest
    }

    fn prev_digest(&self) -> Option<Digest> {
        self.0.prev_digest
    }

    fn payload_bytes(&self) -> Vec<u8> {
        // An entry that cannot be encoded can never match its digest.
        canonical_bytes(self.0).unwrap_or_default()
    }
}

/// Build the entry that extends `record`'s journal.
pub(crate) fn next_entry(
    record: &AccountRecord,
    account_id: &AccountId,
    pool: CreditPool,
    delta: i64,
    balance_after: u64,
    reason: &str,
    recorded_at: DateTime<Utc>,
) -> Result<JournalEntry, HasherError> {
    let mut entry = JournalEntry {
        seq: record.journal_len + 1,
        entry_id: Uuid::now_v7(),
        account_id: account_id.clone(),
        pool,
        delta,
        balance_after,
        reason: reason.to_string(),
        recorded_at,
        prev_digest: record.journal_head,
        digest: Digest::ZERO,
    };
    entry.digest = ContentHasher::JOURNAL_ENTRY.hash(&canonical_bytes(&entry)?);
    Ok(entry)
}

/// Check the chain and replay every delta from the opening balances.
///
/// Returns a human-readable reason on the first discrepancy.
pub(crate) fn verify(
    account_id: &AccountId,
    record: &AccountRecord,
    entries: &[JournalEntry],
) -> Result<JournalReport, String> {
    let links: Vec<Link<'_>> = entries.iter().map(Link).collect();
    JOURNAL_CHAIN.verify(links.as_slice()).map_err(|e| e.to_string())?;

    let mut replayed = record.opening.clone();
    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq != expected_seq {
            return Err(format!("expected seq {expected_seq}, found {}", entry.seq));
        }
        if entry.account_id != *account_id {
            return Err(format!("entry {} belongs to {}", entry.seq, entry.account_id));
        }

        let before = replayed.balance(entry.pool);
        let after = if entry.delta >= 0 {
            before.checked_add(entry.delta.unsigned_abs())
        } else {
            before.checked_sub(entry.delta.unsigned_abs())
        }
        .ok_or_else(|| format!("entry {} does not replay from balance {before}", entry.seq))?;

        if after != entry.balance_after {
            return Err(format!(
                "entry {} records balance {}, replay gives {after}",
                entry.seq, entry.balance_after
            ));
        }
        replayed.set_balance(entry.pool, after);
    }

    if record.journal_len != entries.len() as u64 {
        return Err(format!(
            "record counts {} entries, journal holds {}",
            record.journal_len,
            entries.len()
        ));
    }
    if record.journal_head != entries.last().map(|e| e.digest) {
        return Err("record head does not match last journal entry".into());
    }
    for pool in CreditPool::ALL {
        if replayed.balance(pool) != record.account.balance(pool) {
            return Err(format!(
                "{pool} balance is {}, journal replays to {}",
                record.account.balance(pool),
                replayed.balance(pool)
            ));
        }
    }

    Ok(JournalReport {
        account_id: account_id.clone(),
        entries: entries.len() as u64,
        head: record.journal_head,
        free_credits: record.account.free_credits,
        paid_credits: record.account.paid_credits,
    })
}
