use std::sync::Arc;

use coach_crypto::AdminSecret;
use coach_gate::{HttpPlatformVerifier, PlatformVerifier, PurchaseGateway, StaticVerifier};
use coach_ledger::CreditLedger;
use coach_store::{AccountStore, FileAccountStore, InMemoryAccountStore};
use coach_types::{SystemClock, TransactionId};
use tokio::net::TcpListener;

use crate::auth::SharedSecretAuth;
use crate::config::{ServiceConfig, StoreConfig, VerifierConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Coaching credit service.
pub struct CoachServer {
    config: ServiceConfig,
    state: AppState,
}

impl CoachServer {
    pub fn new(config: ServiceConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Wire store, ledger, verifier and gateway from configuration.
    pub fn from_config(config: ServiceConfig) -> ServerResult<Self> {
        let store = open_store(&config.store)?;
        let ledger = Arc::new(CreditLedger::new(
            store,
            Arc::new(SystemClock),
            config.ledger.clone(),
        ));
        let verifier = build_verifier(&config.verifier)?;
        let gateway = Arc::new(PurchaseGateway::new(
            config.gate.clone(),
            verifier,
            ledger.clone(),
        ));

        let auth = SharedSecretAuth::new(AdminSecret::from_env(&config.server.admin_secret_env));
        if !auth.is_enabled() {
            tracing::warn!(
                var = %config.server.admin_secret_env,
                "admin secret not set; admin routes will reject every request"
            );
        }

        let state = AppState {
            ledger,
            gateway,
            auth: Arc::new(auth),
        };
        Ok(Self::new(config, state))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.server.bind_addr).await?;
        tracing::info!("coach server listening on {}", self.config.server.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

fn open_store(config: &StoreConfig) -> ServerResult<Arc<dyn AccountStore>> {
    Ok(match config {
        StoreConfig::Memory => {
            tracing::warn!("using in-memory store; balances are lost on restart");
            Arc::new(InMemoryAccountStore::new())
        }
        StoreConfig::File { path } => {
            tracing::info!(path = %path.display(), "opening file store");
            Arc::new(FileAccountStore::open(path.clone())?)
        }
    })
}

fn build_verifier(config: &VerifierConfig) -> ServerResult<Arc<dyn PlatformVerifier>> {
    Ok(match config {
        VerifierConfig::Http {
            endpoint,
            api_key_env,
        } => {
            let api_key = api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty());
            let verifier = HttpPlatformVerifier::new(endpoint, api_key)
                .map_err(|e| ServerError::Config(format!("verifier.endpoint: {e}")))?;
            Arc::new(verifier)
        }
        VerifierConfig::Static { approved } => {
            tracing::warn!(
                approved = approved.len(),
                "static verifier in use; purchases are not checked with the platform"
            );
            let verifier = StaticVerifier::new();
            for entry in approved {
                let transaction = TransactionId::new(entry.transaction_id.clone())
                    .map_err(|e| ServerError::Config(format!("verifier.approved: {e}")))?;
                verifier.approve(
                    transaction,
                    entry.product_id.clone(),
                    entry.entitlement_type,
                    entry.credit_amount,
                );
            }
            Arc::new(verifier)
        }
    })
}
