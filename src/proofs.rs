use crate::error::StorageError;
use crate::state::LedgerState;
use serde::{Deserialize, Serialize};

/// Block height a proof or receipt belongs to
pub type SlotNumber = u64;

/// Commitment to the full ledger state after a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
    /// The slot this proof was generated for
    pub slot: SlotNumber,

    /// Root of the ledger state at the end of the slot
    pub state_root: [u8; 32],

    /// Hash of the previous slot's proof, `None` for the first proof
    pub prev_proof_hash: Option<[u8; 32]>,
}

impl StateProof {
    /// Hash of this proof, used to link the next proof in the chain
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ESTATE_StateProof");
        hasher.update(&self.slot.to_le_bytes());
        hasher.update(&self.state_root);
        match &self.prev_proof_hash {
            Some(prev) => {
                hasher.update(&[1]);
                hasher.update(prev);
            }
            None => {
                hasher.update(&[0]);
            }
        }
        *hasher.finalize().as_bytes()
    }
}

/// Interface for generating and checking state proofs
///
/// A ProofEngine commits to the ledger state at the end of each block so
/// that a later reader can check that a state matches what was committed,
/// and that the sequence of commitments has not been altered.
pub trait ProofEngine {
    /// Generate a proof for `state` at `slot`, linked to `prev_proof`
    fn generate_state_proof(
        &self,
        state: &LedgerState,
        prev_proof: Option<&StateProof>,
        slot: SlotNumber,
    ) -> Result<StateProof, StorageError>;

    /// Check that `proof` commits to `state`
    fn verify_state_proof(
        &self,
        state: &LedgerState,
        proof: &StateProof,
    ) -> Result<bool, StorageError>;

    /// Check that `proof` directly follows `prev_proof`
    fn verify_state_proof_chain(
        &self,
        proof: &StateProof,
        prev_proof: &StateProof,
    ) -> Result<bool, StorageError> {
        if proof.slot <= prev_proof.slot {
            return Ok(false);
        }
        Ok(proof.prev_proof_hash == Some(prev_proof.hash()))
    }
}

/// Proof engine committing to the SHA-256 state root, chained with BLAKE3
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3ProofEngine;

impl Blake3ProofEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ProofEngine for Blake3ProofEngine {
    fn generate_state_proof(
        &self,
        state: &LedgerState,
        prev_proof: Option<&StateProof>,
        slot: SlotNumber,
    ) -> Result<StateProof, StorageError> {
        if let Some(prev) = prev_proof {
            if slot <= prev.slot {
                return Err(StorageError::ProofChainInvalid(format!(
                    "slot {} does not follow slot {}",
                    slot, prev.slot
                )));
            }
        }
        Ok(StateProof {
            slot,
            state_root: state.state_root()?,
            prev_proof_hash: prev_proof.map(StateProof::hash),
        })
    }

    fn verify_state_proof(
        &self,
        state: &LedgerState,
        proof: &StateProof,
    ) -> Result<bool, StorageError> {
        Ok(state.state_root()? == proof.state_root)
    }
}
