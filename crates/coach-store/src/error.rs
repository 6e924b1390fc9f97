use coach_types::{AccountId, ErrorKind};

use crate::record::PurchaseRecord;

/// Errors from account store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("account already exists: {0}")]
    AccountExists(AccountId),

    /// The record changed between read and commit.
    #[error("version conflict on {account}: expected {expected}, found {actual}")]
    VersionConflict {
        account: AccountId,
        expected: u64,
        actual: u64,
    },

    /// A purchase record for this transaction was committed earlier.
    #[error("purchase already recorded for transaction {}", .0.grant.transaction_id)]
    PurchaseExists(Box<PurchaseRecord>),

    #[error("integrity violation on {account}: {reason}")]
    IntegrityViolation { account: AccountId, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::VersionConflict { .. } => ErrorKind::TransactionConflict,
            Self::PurchaseExists(_) => ErrorKind::DuplicateTransaction,
            Self::AccountExists(_)
            | Self::IntegrityViolation { .. }
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::LockPoisoned => ErrorKind::InternalError,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
