use coach_types::PurchaseAssertion;

use crate::config::CatalogEntry;
use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision};

/// Checks the claimed entitlement and credit amount against the catalog.
///
/// An empty catalog accepts every product.
pub struct CatalogStage {
    catalog: Vec<CatalogEntry>,
}

impl CatalogStage {
    pub fn new(catalog: Vec<CatalogEntry>) -> Self {
        Self { catalog }
    }
}

impl GateStage for CatalogStage {
    fn name(&self) -> &str {
        "catalog"
    }

    fn evaluate(
        &self,
        assertion: &PurchaseAssertion,
        _context: &GateContext,
    ) -> Result<StageDecision, GateError> {
        if self.catalog.is_empty() {
            return Ok(StageDecision::Pass);
        }

        let Some(entry) = self
            .catalog
            .iter()
            .find(|entry| entry.product_id == assertion.product_id)
        else {
            return Ok(StageDecision::fail(format!(
                "unknown product '{}'",
                assertion.product_id
            )));
        };

        if entry.entitlement_type != assertion.entitlement_type {
            return Ok(StageDecision::fail(format!(
                "product '{}' is a {} entitlement, not {}",
                entry.product_id, entry.entitlement_type, assertion.entitlement_type
            )));
        }
        if entry.credit_amount != assertion.credit_amount {
            return Ok(StageDecision::fail(format!(
                "product '{}' grants {} credits, claim was {}",
                entry.product_id, entry.credit_amount, assertion.credit_amount
            )));
        }

        Ok(StageDecision::Pass)
    }
}
