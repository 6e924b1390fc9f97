use std::time::Duration;

use chrono::{DateTime, Utc};
use coach_types::PurchaseAssertion;

use crate::error::GateError;

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The assertion is rejected.
    Fail { reason: String },
}

impl StageDecision {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    /// Populated on failure.
    pub reason: Option<String>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Information available to every stage.
#[derive(Clone, Debug)]
pub struct GateContext {
    /// When the gateway received the assertion.
    pub received_at: DateTime<Utc>,
    /// Results from stages that have already run in this evaluation.
    pub previous_stages: Vec<StageResult>,
}

impl GateContext {
    pub fn new(received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            previous_stages: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the assertion gate.
///
/// Stages are pure checks over the assertion; they never perform I/O.
/// Platform verification happens after the gate, not inside it.
pub trait GateStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        assertion: &PurchaseAssertion,
        context: &GateContext,
    ) -> Result<StageDecision, GateError>;
}
