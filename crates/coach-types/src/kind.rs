use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by every layer of the service.
///
/// Each crate keeps its own error enum; `kind()` on those errors collapses
/// them onto this set so callers get a stable, structured failure code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    AccountNotFound,
    InsufficientBalance,
    TransactionConflict,
    MalformedAssertion,
    VerificationFailed,
    /// Soft failure: the transaction was already accepted and the earlier
    /// result is returned instead of granting again.
    DuplicateTransaction,
    InternalError,
}

impl ErrorKind {
    /// Whether the operation may be retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::TransactionConflict => "TRANSACTION_CONFLICT",
            Self::MalformedAssertion => "MALFORMED_ASSERTION",
            Self::VerificationFailed => "VERIFICATION_FAILED",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
