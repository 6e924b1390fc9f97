use std::time::Duration;

use coach_types::EntitlementType;
use serde::{Deserialize, Serialize};

/// One sellable product and what it grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: String,
    pub entitlement_type: EntitlementType,
    pub credit_amount: u64,
}

/// Configuration for the purchase gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Upper bound on a single platform verification call.
    pub verification_timeout_ms: u64,
    /// Largest credit amount a single purchase may claim.
    pub max_credit_amount: u64,
    /// How far in the future a purchase date may lie.
    pub max_clock_skew_secs: i64,
    /// Known products. Empty means any product id is accepted.
    pub catalog: Vec<CatalogEntry>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            verification_timeout_ms: 5_000,
            max_credit_amount: 100_000,
            max_clock_skew_secs: 300,
            catalog: Vec::new(),
        }
    }
}

impl GateConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }

    pub fn product(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.catalog.iter().find(|entry| entry.product_id == product_id)
    }
}
