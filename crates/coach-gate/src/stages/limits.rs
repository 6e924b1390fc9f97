use chrono::Duration;
use coach_types::PurchaseAssertion;

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision};

/// Bounds on the claimed credit amount and the purchase date.
pub struct LimitsStage {
    max_credit_amount: u64,
    max_clock_skew: Duration,
}

impl LimitsStage {
    pub fn new(max_credit_amount: u64, max_clock_skew_secs: i64) -> Self {
        Self {
            max_credit_amount,
            max_clock_skew: Duration::seconds(max_clock_skew_secs.max(0)),
        }
    }
}

impl GateStage for LimitsStage {
    fn name(&self) -> &str {
        "limits"
    }

    fn evaluate(
        &self,
        assertion: &PurchaseAssertion,
        context: &GateContext,
    ) -> Result<StageDecision, GateError> {
        if assertion.credit_amount > self.max_credit_amount {
            return Ok(StageDecision::fail(format!(
                "creditAmount {} exceeds the limit of {}",
                assertion.credit_amount, self.max_credit_amount
            )));
        }

        let latest = context.received_at + self.max_clock_skew;
        if assertion.purchase_date > latest {
            return Ok(StageDecision::fail(format!(
                "purchaseDate {} is in the future",
                assertion.purchase_date.to_rfc3339()
            )));
        }

        Ok(StageDecision::Pass)
    }
}
