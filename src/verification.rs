//! State proof verification utilities
//!
//! Standalone checks for state proofs and proof chains that do not need a
//! running ledger.

use crate::proofs::{ProofEngine, StateProof};
use crate::state::LedgerState;
use log::warn;

/// Result of a verification operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Verification was successful
    Valid,
    /// Verification failed with a specific reason
    Invalid(String),
    /// Verification couldn't be completed due to missing data
    MissingData(String),
}

impl From<VerificationResult> for Result<(), String> {
    fn from(result: VerificationResult) -> Self {
        match result {
            VerificationResult::Valid => Ok(()),
            VerificationResult::Invalid(msg) => Err(msg),
            VerificationResult::MissingData(msg) => Err(format!("Missing data: {}", msg)),
        }
    }
}

/// Verifier for state proofs
pub struct ProofVerifier<'a> {
    engine: &'a dyn ProofEngine,
}

impl<'a> ProofVerifier<'a> {
    pub fn new(engine: &'a dyn ProofEngine) -> Self {
        Self { engine }
    }

    /// Verify that a proof commits to the given state
    pub fn verify_state(&self, state: &LedgerState, proof: &StateProof) -> VerificationResult {
        match self.engine.verify_state_proof(state, proof) {
            Ok(true) => VerificationResult::Valid,
            Ok(false) => VerificationResult::Invalid(format!(
                "State does not match proof at slot {}",
                proof.slot
            )),
            Err(e) => VerificationResult::Invalid(format!("Verification error: {}", e)),
        }
    }

    /// Verify a sequence of proofs in ascending slot order
    ///
    /// # Parameters
    /// * `proofs` - Proofs ordered by slot, oldest first
    ///
    /// # Returns
    /// A VerificationResult indicating whether every proof links to its predecessor
    pub fn verify_chain(&self, proofs: &[StateProof]) -> VerificationResult {
        if proofs.is_empty() {
            return VerificationResult::MissingData("No proofs provided".to_string());
        }

        for pair in proofs.windows(2) {
            let (prev, current) = (&pair[0], &pair[1]);
            match self.engine.verify_state_proof_chain(current, prev) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        "Proof chain broken between slots {} and {}",
                        prev.slot, current.slot
                    );
                    return VerificationResult::Invalid(format!(
                        "Proof chain broken between slots {} and {}",
                        prev.slot, current.slot
                    ));
                }
                Err(e) => {
                    return VerificationResult::Invalid(format!(
                        "Verification error at slot {}: {}",
                        current.slot, e
                    ))
                }
            }
        }

        VerificationResult::Valid
    }
}
