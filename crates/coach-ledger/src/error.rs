use coach_crypto::HasherError;
use coach_store::StoreError;
use coach_types::{AccountId, CreditPool, ErrorKind, TransactionId};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("account already exists: {0}")]
    AccountExists(AccountId),

    #[error("insufficient {pool} balance on {account}: have {balance}, delta {delta}")]
    InsufficientBalance {
        account: AccountId,
        pool: CreditPool,
        balance: u64,
        delta: i64,
    },

    #[error("{pool} balance on {account} would overflow")]
    BalanceOverflow { account: AccountId, pool: CreditPool },

    #[error("commit on {account} still conflicting after {attempts} attempts")]
    TransactionConflict { account: AccountId, attempts: u32 },

    #[error("transaction {transaction} was already granted to another account")]
    TransactionClaimed { transaction: TransactionId },

    #[error("journal of {account} failed verification: {reason}")]
    JournalCorrupted { account: AccountId, reason: String },

    #[error("hashing error: {0}")]
    Hash(#[from] HasherError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::TransactionConflict { .. } => ErrorKind::TransactionConflict,
            Self::TransactionClaimed { .. } => ErrorKind::VerificationFailed,
            Self::Store(inner) => inner.kind(),
            Self::AccountExists(_)
            | Self::BalanceOverflow { .. }
            | Self::JournalCorrupted { .. }
            | Self::Hash(_) => ErrorKind::InternalError,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
