use std::sync::Arc;

use coach_ledger::{CreditLedger, PurchaseCommit, PurchaseGrant};
use coach_types::{EntitlementType, PurchaseAssertion, PurchaseSubmission};
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::gate::AssertionGate;
use crate::verifier::{PlatformVerifier, VerificationOutcome};

/// Turns purchase assertions into ledger grants.
///
/// Holds no per-request state; concurrent acceptances only meet inside the
/// ledger commit.
pub struct PurchaseGateway {
    gate: AssertionGate,
    verifier: Arc<dyn PlatformVerifier>,
    ledger: Arc<CreditLedger>,
    config: GateConfig,
}

impl PurchaseGateway {
    pub fn new(
        config: GateConfig,
        verifier: Arc<dyn PlatformVerifier>,
        ledger: Arc<CreditLedger>,
    ) -> Self {
        Self {
            gate: AssertionGate::with_default_stages(&config),
            verifier,
            ledger,
            config,
        }
    }

    /// Replace the default stage pipeline.
    pub fn with_gate(mut self, gate: AssertionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<CreditLedger> {
        &self.ledger
    }

    /// Parse a raw client submission, then accept it.
    pub async fn accept_submission(&self, submission: PurchaseSubmission) -> GateResult<PurchaseCommit> {
        let assertion = submission.parse(self.ledger.clock().now())?;
        self.accept_purchase(&assertion).await
    }

    /// Validate, verify, and grant a purchase.
    ///
    /// Resubmitting an accepted transaction returns the original grant as
    /// [`PurchaseCommit::AlreadyApplied`]. Any rejection leaves the ledger
    /// untouched.
    pub async fn accept_purchase(&self, assertion: &PurchaseAssertion) -> GateResult<PurchaseCommit> {
        let received_at = self.ledger.clock().now();

        let report = self.gate.evaluate(assertion, received_at)?;
        if let Some(reason) = report.rejection() {
            warn!(
                account = %assertion.account_id,
                transaction = %assertion.transaction_id,
                product = %assertion.product_id,
                %reason,
                "purchase assertion rejected"
            );
            return Err(GateError::Malformed(reason.to_string()));
        }

        self.verify(assertion).await?;

        let accepted_at = self.ledger.clock().now();
        let grant = PurchaseGrant {
            account_id: assertion.account_id.clone(),
            transaction_id: assertion.transaction_id.clone(),
            product_id: assertion.product_id.clone(),
            platform: assertion.platform,
            entitlement_type: assertion.entitlement_type,
            credit_amount: assertion.credit_amount,
            accepted_at,
            expiry: assertion.entitlement_type.expiry_from(accepted_at),
        };

        let commit = self.ledger.grant_purchase(&grant)?;
        info!(
            account = %assertion.account_id,
            transaction = %assertion.transaction_id,
            replayed = commit.is_replay(),
            balance = commit.grant().new_balance,
            "purchase accepted"
        );
        Ok(commit)
    }

    async fn verify(&self, assertion: &PurchaseAssertion) -> GateResult<()> {
        let transaction = &assertion.transaction_id;
        let timeout = self.config.verification_timeout();

        let outcome = match tokio::time::timeout(
            timeout,
            self.verifier.verify(assertion.platform, transaction),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(transaction = %transaction, error = %e, "platform verification unavailable");
                return Err(GateError::verification(transaction, e.to_string()));
            }
            Err(_) => {
                warn!(transaction = %transaction, ?timeout, "platform verification timed out");
                return Err(GateError::verification(
                    transaction,
                    format!("no answer within {}ms", timeout.as_millis()),
                ));
            }
        };

        match outcome {
            VerificationOutcome::Verified {
                product_id,
                entitlement_type,
                credit_amount,
            } => {
                if product_id != assertion.product_id {
                    warn!(
                        transaction = %transaction,
                        claimed = %assertion.product_id,
                        verified = %product_id,
                        "verified product does not match claim"
                    );
                    return Err(GateError::verification(
                        transaction,
                        format!("platform reports product '{product_id}'"),
                    ));
                }
                self.confirm_terms(assertion, entitlement_type, credit_amount)
            }
            VerificationOutcome::Rejected { reason } => {
                warn!(transaction = %transaction, %reason, "platform rejected transaction");
                Err(GateError::verification(transaction, reason))
            }
            VerificationOutcome::Pending => {
                warn!(transaction = %transaction, "transaction still pending");
                Err(GateError::verification(transaction, "payment pending"))
            }
        }
    }

    /// The claimed entitlement and credit amount must match what the
    /// platform reported, or the catalog entry where the platform was silent.
    fn confirm_terms(
        &self,
        assertion: &PurchaseAssertion,
        entitlement_type: Option<EntitlementType>,
        credit_amount: Option<u64>,
    ) -> GateResult<()> {
        let transaction = &assertion.transaction_id;
        let catalog = self.config.product(&assertion.product_id);
        let entitlement_type = entitlement_type.or(catalog.map(|entry| entry.entitlement_type));
        let credit_amount = credit_amount.or(catalog.map(|entry| entry.credit_amount));

        match (entitlement_type, credit_amount) {
            (Some(entitlement), Some(credits))
                if entitlement == assertion.entitlement_type
                    && credits == assertion.credit_amount =>
            {
                Ok(())
            }
            (Some(entitlement), Some(credits)) => {
                warn!(
                    transaction = %transaction,
                    claimed_credits = assertion.credit_amount,
                    verified_credits = credits,
                    claimed_entitlement = %assertion.entitlement_type,
                    verified_entitlement = %entitlement,
                    "verified grant does not match claim"
                );
                Err(GateError::verification(
                    transaction,
                    format!(
                        "product '{}' grants {credits} credits as {entitlement}, claim was {} as {}",
                        assertion.product_id, assertion.credit_amount, assertion.entitlement_type
                    ),
                ))
            }
            _ => {
                warn!(
                    transaction = %transaction,
                    product = %assertion.product_id,
                    "grant terms unknown to platform and catalog"
                );
                Err(GateError::verification(
                    transaction,
                    format!(
                        "grant terms for product '{}' not confirmed by platform or catalog",
                        assertion.product_id
                    ),
                ))
            }
        }
    }
}
