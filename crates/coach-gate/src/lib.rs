//! Purchase acceptance gateway for the coaching credit service.
//!
//! A client-submitted purchase assertion becomes a credit grant only after
//! three steps, in order:
//!
//! 1. the assertion gate: a fail-fast pipeline of synchronous stages
//!    (structure, catalog, limits) that rejects malformed claims;
//! 2. platform verification through a [`PlatformVerifier`], bounded by a
//!    timeout; anything other than a matching `Verified` is a rejection;
//! 3. the ledger grant, which records the transaction id in the same commit
//!    as the balance change, so a resubmission replays the first result.
//!
//! Rejected assertions never touch the ledger.

pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod stage;
pub mod stages;
pub mod verifier;

pub use config::{CatalogEntry, GateConfig};
pub use error::{GateError, GateResult};
pub use gate::{AssertionGate, GateDecision, GateReport};
pub use gateway::PurchaseGateway;
pub use stage::{GateContext, GateStage, StageDecision, StageResult};
pub use stages::{CatalogStage, LimitsStage, StructureStage};
pub use verifier::{
    HttpPlatformVerifier, PlatformVerifier, StaticVerifier, VerificationOutcome, VerifierError,
};
