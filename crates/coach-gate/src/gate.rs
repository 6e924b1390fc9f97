use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use coach_types::PurchaseAssertion;
use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageResult};
use crate::stages::{CatalogStage, LimitsStage, StructureStage};

/// Final decision of the assertion gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    Rejected { reason: String },
}

/// The outcome of running an assertion through the full pipeline.
#[derive(Clone, Debug)]
pub struct GateReport {
    pub decision: GateDecision,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl GateReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self.decision, GateDecision::Accepted)
    }

    pub fn rejection(&self) -> Option<&str> {
        match &self.decision {
            GateDecision::Accepted => None,
            GateDecision::Rejected { reason } => Some(reason),
        }
    }
}

/// Ordered, fail-fast pipeline of assertion checks.
pub struct AssertionGate {
    stages: Vec<Box<dyn GateStage>>,
}

impl AssertionGate {
    /// Empty pipeline. Accepts everything until stages are added.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Structure -> Catalog -> Limits
    pub fn with_default_stages(config: &GateConfig) -> Self {
        let mut gate = Self::new();
        gate.add_stage(Box::new(StructureStage));
        gate.add_stage(Box::new(CatalogStage::new(config.catalog.clone())));
        gate.add_stage(Box::new(LimitsStage::new(
            config.max_credit_amount,
            config.max_clock_skew_secs,
        )));
        gate
    }

    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn evaluate(
        &self,
        assertion: &PurchaseAssertion,
        received_at: DateTime<Utc>,
    ) -> Result<GateReport, GateError> {
        let pipeline_start = Instant::now();
        let mut context = GateContext::new(received_at);
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(assertion, &context)?;

            let result = StageResult {
                stage_name: stage.name().to_string(),
                passed: decision.is_pass(),
                reason: match &decision {
                    StageDecision::Pass => None,
                    StageDecision::Fail { reason } => Some(reason.clone()),
                },
                elapsed: stage_start.elapsed(),
            };
            stage_results.push(result.clone());
            context.previous_stages.push(result);

            if let StageDecision::Fail { reason } = decision {
                debug!(
                    transaction = %assertion.transaction_id,
                    stage = stage.name(),
                    %reason,
                    "assertion rejected by gate"
                );
                return Ok(GateReport {
                    decision: GateDecision::Rejected { reason },
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(GateReport {
            decision: GateDecision::Accepted,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }
}

impl Default for AssertionGate {
    fn default() -> Self {
        Self::new()
    }
}
