//! Credit ledger for the coaching credit service.
//!
//! The ledger owns the per-account balances. It provides:
//! - [`CreditLedger::adjust_balance`]: signed delta on one pool, failing on underflow
//! - [`CreditLedger::consume_credit`]: spend one credit, free pool first
//! - [`CreditLedger::grant_purchase`]: idempotent purchase grant keyed by transaction id
//! - [`CreditLedger::verify_journal`]: hash chain check and balance reconciliation
//!
//! Every mutation is a read-modify-write against a versioned record. The
//! commit names the version it read; on conflict the whole step is recomputed
//! from a fresh snapshot, up to [`LedgerConfig::max_attempts`] times.

pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use journal::JournalReport;
pub use ledger::{AccountSnapshot, Consumption, CreditLedger, PurchaseCommit, PurchaseGrant};
