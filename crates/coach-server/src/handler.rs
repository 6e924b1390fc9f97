use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use coach_ledger::AccountSnapshot;
use coach_types::{AccountId, CreditPool, GrantResult, PurchaseSubmission};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{AdminAction, Credentials};
use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

const ADMIN_ADJUST_REASON: &str = "admin-adjust";
const CONSUME_REASON: &str = "consume";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------
//
// Admin requests also carry `credential`, read by `authorize_admin`.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustCreditsRequest {
    pub target_account_id: String,
    pub amount: i64,
    pub pool: CreditPool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustCreditsResponse {
    pub success: bool,
    pub new_balance: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub target_account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub target_account_id: String,
    #[serde(default)]
    pub free_credits: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptPurchaseResponse {
    #[serde(flatten)]
    pub grant: GrantResult,
    /// `true` when the transaction had been accepted before.
    pub replayed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub account_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub success: bool,
    pub pool: CreditPool,
    pub remaining_credits: u64,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ServerResult<T> {
    serde_json::from_slice(body).map_err(|e| ServerError::Malformed(e.to_string()))
}

/// Credential and target, read ahead of the full request shape.
///
/// Every field is loose JSON so that a badly shaped request from an
/// unauthenticated caller still fails authorization first.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminEnvelope {
    credential: Option<serde_json::Value>,
    target_account_id: Option<serde_json::Value>,
}

async fn authorize_admin(
    state: &AppState,
    body: &Bytes,
    action: fn(String) -> AdminAction,
) -> ServerResult<()> {
    let envelope: AdminEnvelope = serde_json::from_slice(body).unwrap_or_default();
    let credential = envelope
        .credential
        .and_then(|value| value.as_str().map(str::to_owned));
    let target = match envelope.target_account_id {
        Some(serde_json::Value::String(raw)) => raw,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    state
        .auth
        .authorize(&Credentials::from_option(credential), &action(target))
        .await
}

fn parse_account(field: &str, raw: String) -> ServerResult<AccountId> {
    AccountId::new(raw).map_err(|e| ServerError::Malformed(format!("{field}: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "coach-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Admin credit grant or deduction on one pool.
pub async fn adjust_credits_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<AdjustCreditsResponse>> {
    authorize_admin(&state, &body, |target| AdminAction::AdjustCredits { target }).await?;
    let req: AdjustCreditsRequest = parse_body(&body)?;
    let account = parse_account("targetAccountId", req.target_account_id)?;

    let reason = req.reason.as_deref().unwrap_or(ADMIN_ADJUST_REASON);
    let new_balance = state
        .ledger
        .adjust_balance(&account, req.pool, req.amount, reason)?;

    Ok(Json(AdjustCreditsResponse {
        success: true,
        new_balance,
    }))
}

pub async fn get_account_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<AccountSnapshot>> {
    authorize_admin(&state, &body, |target| AdminAction::ReadAccount { target }).await?;
    let req: AccountRequest = parse_body(&body)?;
    let account = parse_account("targetAccountId", req.target_account_id)?;

    Ok(Json(state.ledger.account(&account)?))
}

pub async fn provision_account_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<AccountSnapshot>)> {
    authorize_admin(&state, &body, |target| AdminAction::ProvisionAccount { target }).await?;
    let req: ProvisionRequest = parse_body(&body)?;
    let account = parse_account("targetAccountId", req.target_account_id)?;

    let snapshot = state.ledger.provision_account(&account, req.free_credits)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn accept_purchase_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<AcceptPurchaseResponse>> {
    let submission: PurchaseSubmission = parse_body(&body)?;
    let commit = state.gateway.accept_submission(submission).await?;
    let replayed = commit.is_replay();

    Ok(Json(AcceptPurchaseResponse {
        grant: commit.into_grant(),
        replayed,
    }))
}

pub async fn consume_credit_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<ConsumeResponse>> {
    let req: ConsumeRequest = parse_body(&body)?;
    let account = parse_account("accountId", req.account_id)?;
    let consumption = state.ledger.consume_credit(&account, CONSUME_REASON)?;

    Ok(Json(ConsumeResponse {
        success: true,
        pool: consumption.pool,
        remaining_credits: consumption.remaining,
    }))
}
