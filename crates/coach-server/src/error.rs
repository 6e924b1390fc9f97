use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use coach_types::ErrorKind;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Admin credential missing or wrong. The message never carries the
    /// presented value.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request body is not the expected JSON shape.
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Ledger(#[from] coach_ledger::LedgerError),

    #[error(transparent)]
    Gate(#[from] coach_gate::GateError),

    #[error("store error: {0}")]
    Store(#[from] coach_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Malformed(_) => ErrorKind::MalformedAssertion,
            Self::Ledger(e) => e.kind(),
            Self::Gate(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        if let Self::Ledger(coach_ledger::LedgerError::AccountExists(_)) = self {
            return StatusCode::CONFLICT;
        }
        match self.kind() {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::AccountNotFound => StatusCode::NOT_FOUND,
            ErrorKind::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::TransactionConflict | ErrorKind::DuplicateTransaction => StatusCode::CONFLICT,
            ErrorKind::MalformedAssertion => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::VerificationFailed => StatusCode::FORBIDDEN,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            tracing::error!(%kind, error = %self, "request failed");
        } else {
            tracing::debug!(%kind, error = %self, "request rejected");
        }
        let body = json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
