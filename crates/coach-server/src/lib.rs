//! HTTP server for the coaching credit service.
//!
//! Exposes the credit ledger and the purchase gateway as JSON RPCs over
//! axum. Admin routes require the shared admin credential; failures are
//! rendered as `{"error": {"kind", "message"}}` with a status derived from
//! the error kind.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{AdminAction, AdminAuthorizer, Credentials, SharedSecretAuth};
pub use config::{ApprovedTransaction, ServerConfig, ServiceConfig, StoreConfig, VerifierConfig};
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::CoachServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::{Duration, TimeZone, Utc};
    use coach_crypto::AdminSecret;
    use coach_gate::{GateConfig, PurchaseGateway, StaticVerifier};
    use coach_ledger::{CreditLedger, LedgerConfig};
    use coach_store::InMemoryAccountStore;
    use coach_types::{AccountId, EntitlementType, ManualClock, TransactionId};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const SECRET: &str = "admin-s3cret";

    fn app() -> (Router, Arc<CreditLedger>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap(),
        ));
        let ledger = Arc::new(CreditLedger::new(
            Arc::new(InMemoryAccountStore::new()),
            clock,
            LedgerConfig::default(),
        ));
        let verifier = StaticVerifier::new();
        verifier.approve(
            TransactionId::new("t1").unwrap(),
            "p1",
            EntitlementType::Consumable,
            50,
        );
        verifier.approve(
            TransactionId::new("sub-1").unwrap(),
            "premium_monthly",
            EntitlementType::Subscription,
            100,
        );
        let gateway = Arc::new(PurchaseGateway::new(
            GateConfig::default(),
            Arc::new(verifier),
            ledger.clone(),
        ));
        let state = AppState {
            ledger: ledger.clone(),
            gateway,
            auth: Arc::new(SharedSecretAuth::new(AdminSecret::new(SECRET))),
        };
        ledger
            .provision_account(&AccountId::new("u1").unwrap(), 0)
            .unwrap();
        (build_router(state), ledger)
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        send(app, uri, Body::from(body.to_string())).await
    }

    async fn send(app: &Router, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn paid(ledger: &CreditLedger) -> u64 {
        ledger
            .account(&AccountId::new("u1").unwrap())
            .unwrap()
            .paid_credits
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn admin_adjust_with_valid_credential() {
        let (app, ledger) = app();
        let (status, body) = post(
            &app,
            "/v1/admin/credits/adjust",
            json!({"targetAccountId": "u1", "amount": 25, "pool": "paid", "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "newBalance": 25}));
        assert_eq!(paid(&ledger), 25);
    }

    #[tokio::test]
    async fn admin_adjust_with_wrong_credential_does_not_mutate() {
        let (app, ledger) = app();
        let (status, body) = post(
            &app,
            "/v1/admin/credits/adjust",
            json!({"targetAccountId": "u1", "amount": 25, "pool": "paid", "credential": "guess"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "UNAUTHORIZED");
        assert!(!body.to_string().contains("guess"));
        assert_eq!(paid(&ledger), 0);

        let (status, _) = post(
            &app,
            "/v1/admin/credits/adjust",
            json!({"targetAccountId": "u1", "amount": 25, "pool": "paid"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(paid(&ledger), 0);
    }

    #[tokio::test]
    async fn admin_credential_is_checked_before_request_shape() {
        let (app, _) = app();
        for uri in [
            "/v1/admin/credits/adjust",
            "/v1/admin/accounts/get",
            "/v1/admin/accounts/provision",
        ] {
            let (status, _) = post(
                &app,
                uri,
                json!({"targetAccountId": "bad/id", "amount": "lots", "credential": "guess"}),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");

            let (status, _) = send(&app, uri, Body::from("{not json")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }

        let (status, body) = post(
            &app,
            "/v1/admin/accounts/get",
            json!({"targetAccountId": "bad/id", "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("targetAccountId"));
    }

    #[tokio::test]
    async fn verified_purchase_with_inflated_amount_is_forbidden() {
        let (app, ledger) = app();
        let (status, body) = post(
            &app,
            "/v1/purchases/accept",
            json!({
                "accountId": "u1",
                "productId": "p1",
                "transactionId": "t1",
                "entitlementType": "consumable",
                "creditAmount": 100000,
                "platform": "ios",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "VERIFICATION_FAILED");
        assert_eq!(paid(&ledger), 0);
    }

    #[tokio::test]
    async fn admin_adjust_underflow_is_payment_required() {
        let (app, ledger) = app();
        let (status, body) = post(
            &app,
            "/v1/admin/credits/adjust",
            json!({"targetAccountId": "u1", "amount": -1, "pool": "free", "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["kind"], "INSUFFICIENT_BALANCE");
        assert_eq!(ledger.account(&AccountId::new("u1").unwrap()).unwrap().free_credits, 0);
    }

    #[tokio::test]
    async fn admin_adjust_unknown_account() {
        let (app, _) = app();
        let (status, body) = post(
            &app,
            "/v1/admin/credits/adjust",
            json!({"targetAccountId": "ghost", "amount": 5, "pool": "paid", "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "ACCOUNT_NOT_FOUND");
    }

    #[tokio::test]
    async fn provision_and_read_account() {
        let (app, _) = app();
        let (status, body) = post(
            &app,
            "/v1/admin/accounts/provision",
            json!({"targetAccountId": "u2", "freeCredits": 3, "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["freeCredits"], 3);

        let (status, _) = post(
            &app,
            "/v1/admin/accounts/provision",
            json!({"targetAccountId": "u2", "freeCredits": 3, "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = post(
            &app,
            "/v1/admin/accounts/get",
            json!({"targetAccountId": "u2", "credential": SECRET}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accountId"], "u2");
        assert_eq!(body["totalCredits"], 3);
        assert_eq!(body["isPremium"], false);
    }

    #[tokio::test]
    async fn accept_purchase_is_idempotent() {
        let (app, ledger) = app();
        let assertion = json!({
            "accountId": "u1",
            "productId": "p1",
            "transactionId": "t1",
            "entitlementType": "consumable",
            "creditAmount": 50,
            "platform": "android",
        });

        let (status, first) = post(&app, "/v1/purchases/accept", assertion.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["accepted"], true);
        assert_eq!(first["creditAmount"], 50);
        assert_eq!(first["expiry"], Value::Null);
        assert_eq!(first["newBalance"], 50);
        assert_eq!(first["replayed"], false);

        let (status, second) = post(&app, "/v1/purchases/accept", assertion).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["newBalance"], 50);
        assert_eq!(second["replayed"], true);
        assert_eq!(paid(&ledger), 50);
    }

    #[tokio::test]
    async fn subscription_purchase_reports_expiry() {
        let (app, _) = app();
        let (status, body) = post(
            &app,
            "/v1/purchases/accept",
            json!({
                "accountId": "u1",
                "productId": "premium_monthly",
                "transactionId": "sub-1",
                "entitlementType": "subscription",
                "creditAmount": 100,
                "platform": "ios",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let expected = Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap() + Duration::days(30);
        let expiry: chrono::DateTime<Utc> =
            serde_json::from_value(body["expiry"].clone()).unwrap();
        assert_eq!(expiry, expected);
    }

    #[tokio::test]
    async fn unverified_purchase_is_forbidden() {
        let (app, ledger) = app();
        let (status, body) = post(
            &app,
            "/v1/purchases/accept",
            json!({
                "accountId": "u1",
                "productId": "p1",
                "transactionId": "forged-1",
                "entitlementType": "consumable",
                "creditAmount": 5000,
                "platform": "web",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "VERIFICATION_FAILED");
        assert_eq!(paid(&ledger), 0);
    }

    #[tokio::test]
    async fn malformed_purchase_body() {
        let (app, _) = app();
        let (status, body) = send(&app, "/v1/purchases/accept", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["kind"], "MALFORMED_ASSERTION");

        let (status, body) = post(
            &app,
            "/v1/purchases/accept",
            json!({"accountId": "u1", "transactionId": "t1", "platform": "ios"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"].as_str().unwrap().contains("productId"));
    }

    #[tokio::test]
    async fn consume_spends_free_then_paid() {
        let (app, ledger) = app();
        let u1 = AccountId::new("u1").unwrap();
        ledger
            .adjust_balance(&u1, coach_types::CreditPool::Free, 1, "promo")
            .unwrap();
        ledger
            .adjust_balance(&u1, coach_types::CreditPool::Paid, 1, "grant")
            .unwrap();

        let (status, body) = post(&app, "/v1/credits/consume", json!({"accountId": "u1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "pool": "free", "remainingCredits": 1}));

        let (_, body) = post(&app, "/v1/credits/consume", json!({"accountId": "u1"})).await;
        assert_eq!(body["pool"], "paid");
        assert_eq!(body["remainingCredits"], 0);

        let (status, body) = post(&app, "/v1/credits/consume", json!({"accountId": "u1"})).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["kind"], "INSUFFICIENT_BALANCE");
    }
}
