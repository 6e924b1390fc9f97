use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use coach_gate::GateConfig;
use coach_ledger::LedgerConfig;
use coach_types::EntitlementType;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Complete service configuration, one TOML table per concern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub gate: GateConfig,
    pub verifier: VerifierConfig,
    pub store: StoreConfig,
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Environment variable holding the admin secret. The secret itself is
    /// never written to the config file.
    pub admin_secret_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            admin_secret_env: "COACH_ADMIN_SECRET".into(),
        }
    }
}

/// A transaction the static verifier confirms, with the terms it grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedTransaction {
    pub transaction_id: String,
    pub product_id: String,
    pub entitlement_type: EntitlementType,
    pub credit_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VerifierConfig {
    /// Store-verification service reached over HTTP.
    Http {
        endpoint: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key_env: Option<String>,
    },
    /// Fixed list of approved transactions. Local development only.
    Static {
        #[serde(default)]
        approved: Vec<ApprovedTransaction>,
    },
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::Static {
            approved: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    /// JSON snapshot file, rewritten atomically on every commit.
    File { path: PathBuf },
}
