use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use coach_gate::PurchaseGateway;
use coach_ledger::CreditLedger;
use tower_http::trace::TraceLayer;

use crate::auth::AdminAuthorizer;
use crate::handler;

/// Shared handles for every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    pub gateway: Arc<PurchaseGateway>,
    pub auth: Arc<dyn AdminAuthorizer>,
}

/// Build the axum router with every service endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/admin/credits/adjust", post(handler::adjust_credits_handler))
        .route("/v1/admin/accounts/get", post(handler::get_account_handler))
        .route("/v1/admin/accounts/provision", post(handler::provision_account_handler))
        .route("/v1/purchases/accept", post(handler::accept_purchase_handler))
        .route("/v1/credits/consume", post(handler::consume_credit_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
