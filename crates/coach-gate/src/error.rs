use coach_ledger::LedgerError;
use coach_types::{ErrorKind, TransactionId, TypeError};

/// Errors produced while accepting a purchase.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The assertion is missing a field or has the wrong shape.
    #[error("malformed assertion: {0}")]
    Malformed(String),

    /// The platform rejected the transaction or could not confirm it.
    #[error("verification failed for {transaction}: {reason}")]
    VerificationFailed {
        transaction: TransactionId,
        reason: String,
    },

    /// A stage could not evaluate the assertion.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type GateResult<T> = Result<T, GateError>;

impl GateError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn verification(transaction: &TransactionId, reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            transaction: transaction.clone(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::MalformedAssertion,
            Self::VerificationFailed { .. } => ErrorKind::VerificationFailed,
            Self::StageError { .. } => ErrorKind::InternalError,
            Self::Ledger(e) => e.kind(),
        }
    }
}

impl From<TypeError> for GateError {
    fn from(e: TypeError) -> Self {
        Self::Malformed(e.to_string())
    }
}
