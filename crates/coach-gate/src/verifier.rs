//! Platform-side confirmation of purchase transactions.
//!
//! The gateway never trusts a client claim on its own: every transaction id
//! is looked up with the issuing store through a [`PlatformVerifier`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use coach_types::{EntitlementType, Platform, TransactionId};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// What the platform said about a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationOutcome {
    /// The platform confirms the payment for `product_id`.
    ///
    /// `entitlement_type` and `credit_amount` are the terms the platform
    /// grants. When it omits them the product catalog must supply them.
    Verified {
        #[serde(rename = "productId")]
        product_id: String,
        #[serde(
            rename = "entitlementType",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        entitlement_type: Option<EntitlementType>,
        #[serde(rename = "creditAmount", default, skip_serializing_if = "Option::is_none")]
        credit_amount: Option<u64>,
    },
    /// The platform denies the transaction (unknown, refunded, revoked).
    Rejected { reason: String },
    /// Payment has not settled yet.
    Pending,
}

impl VerificationOutcome {
    /// Confirmation of the product only, without grant terms.
    pub fn verified(product_id: impl Into<String>) -> Self {
        Self::Verified {
            product_id: product_id.into(),
            entitlement_type: None,
            credit_amount: None,
        }
    }

    /// Confirmation of the product together with what it grants.
    pub fn granted(
        product_id: impl Into<String>,
        entitlement_type: EntitlementType,
        credit_amount: u64,
    ) -> Self {
        Self::Verified {
            product_id: product_id.into(),
            entitlement_type: Some(entitlement_type),
            credit_amount: Some(credit_amount),
        }
    }
}

/// The verifier could not obtain an answer.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("invalid verifier endpoint: {0}")]
    Endpoint(String),
}

#[async_trait]
pub trait PlatformVerifier: Send + Sync {
    async fn verify(
        &self,
        platform: Platform,
        transaction: &TransactionId,
    ) -> Result<VerificationOutcome, VerifierError>;
}

// ── HTTP ──────────────────────────────────────────────────────────

/// Verifier backed by a store-verification service.
///
/// Issues `GET {endpoint}/{platform}/transactions/{transaction}` and expects
/// a JSON body shaped like [`VerificationOutcome`]. The transaction id is
/// sent as a single percent-encoded path segment. A 404 is a rejection;
/// any other non-success status is a transport failure.
#[derive(Debug)]
pub struct HttpPlatformVerifier {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpPlatformVerifier {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, VerifierError> {
        Self::with_client(Client::new(), endpoint, api_key)
    }

    /// Create with a custom reqwest [`Client`] (proxies, TLS roots).
    pub fn with_client(
        client: Client,
        endpoint: &str,
        api_key: Option<String>,
    ) -> Result<Self, VerifierError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| VerifierError::Endpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(VerifierError::Endpoint(format!(
                "{endpoint}: expected an http(s) base URL"
            )));
        }
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn transaction_url(
        &self,
        platform: Platform,
        transaction: &TransactionId,
    ) -> Result<Url, VerifierError> {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| VerifierError::Endpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(platform.as_str())
            .push("transactions")
            .push(transaction.as_str());
        Ok(url)
    }
}

#[async_trait]
impl PlatformVerifier for HttpPlatformVerifier {
    async fn verify(
        &self,
        platform: Platform,
        transaction: &TransactionId,
    ) -> Result<VerificationOutcome, VerifierError> {
        let mut req = self.client.get(self.transaction_url(platform, transaction)?);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VerifierError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(VerificationOutcome::Rejected {
                reason: "transaction unknown to platform".into(),
            }),
            status if status.is_success() => resp
                .json::<VerificationOutcome>()
                .await
                .map_err(|e| VerifierError::Protocol(e.to_string())),
            status => Err(VerifierError::Transport(format!("HTTP {}", status.as_u16()))),
        }
    }
}

// ── Static ────────────────────────────────────────────────────────

/// Fixed table of outcomes, for local development and tests.
///
/// Transactions not in the table are rejected.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    outcomes: RwLock<HashMap<TransactionId, VerificationOutcome>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, transaction: TransactionId, outcome: VerificationOutcome) {
        // A single insert cannot leave the table half-written.
        self.outcomes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(transaction, outcome);
    }

    /// Confirm `transaction` as a purchase of `product_id` granting
    /// `credit_amount` credits.
    pub fn approve(
        &self,
        transaction: TransactionId,
        product_id: impl Into<String>,
        entitlement_type: EntitlementType,
        credit_amount: u64,
    ) {
        self.set(
            transaction,
            VerificationOutcome::granted(product_id, entitlement_type, credit_amount),
        );
    }
}

#[async_trait]
impl PlatformVerifier for StaticVerifier {
    async fn verify(
        &self,
        _platform: Platform,
        transaction: &TransactionId,
    ) -> Result<VerificationOutcome, VerifierError> {
        let outcomes = self
            .outcomes
            .read()
            .map_err(|_| VerifierError::Transport("verifier table poisoned".into()))?;
        Ok(outcomes
            .get(transaction)
            .cloned()
            .unwrap_or_else(|| VerificationOutcome::Rejected {
                reason: "transaction not approved".into(),
            }))
    }
}

/// Loopback HTTP server standing in for a store-verification service.
#[cfg(test)]
pub(crate) mod mock_platform {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub(crate) struct MockPlatform {
        pub endpoint: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockPlatform {
        /// Serve `routes` (request path to JSON body); other paths get 404.
        pub(crate) async fn start(routes: HashMap<String, Value>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let endpoint = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = requests.clone();

            tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        return;
                    };
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf);
                    let path = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push(path.clone());

                    let (status, body) = match routes.get(&path) {
                        Some(body) => ("200 OK", body.to_string()),
                        None => ("404 Not Found", String::new()),
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            Self { endpoint, requests }
        }

        /// Request paths received so far, in order.
        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }
}
