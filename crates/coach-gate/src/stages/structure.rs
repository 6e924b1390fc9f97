use coach_types::PurchaseAssertion;

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision};

const MAX_PRODUCT_ID_LEN: usize = 128;

/// Shape checks the typed parse cannot express.
///
/// Product ids are SKU strings: non-empty, bounded, with no whitespace or
/// control characters.
pub struct StructureStage;

impl GateStage for StructureStage {
    fn name(&self) -> &str {
        "structure"
    }

    fn evaluate(
        &self,
        assertion: &PurchaseAssertion,
        _context: &GateContext,
    ) -> Result<StageDecision, GateError> {
        let product = assertion.product_id.as_str();

        if product.is_empty() {
            return Ok(StageDecision::fail("productId must not be empty"));
        }
        if product.len() > MAX_PRODUCT_ID_LEN {
            return Ok(StageDecision::fail(format!(
                "productId longer than {MAX_PRODUCT_ID_LEN} bytes"
            )));
        }
        if product.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Ok(StageDecision::fail(
                "productId must not contain whitespace or control characters",
            ));
        }

        Ok(StageDecision::Pass)
    }
}
