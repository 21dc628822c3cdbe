pub mod config;
pub mod error;
pub mod id;
pub mod objects;
pub mod proofs;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod storage;
pub mod storage_traits;
pub mod tokenization;
pub mod verification;

// Re-export the main types for convenience
pub use config::LedgerConfig;
pub use error::{ErrorCode, LedgerError, StorageError};
pub use id::{Principal, PropertyId};
pub use objects::{Location, Property, ShareSupply, MAX_LOCATION_LEN};
pub use proofs::{Blake3ProofEngine, ProofEngine, SlotNumber, StateProof};
pub use registry::PropertyRegistry;
pub use runtime::{
    Block,
    CommitmentLevel,
    LedgerRuntime,
    Runtime,
    Transaction,
    TransactionHash,
    TransactionReceipt,
};
pub use state::{Call, CallOutput, LedgerSnapshot, LedgerState};
pub use storage::{FileWriteAheadLog, InMemoryReceiptStorage};
pub use storage_traits::{ReceiptIterator, TransactionReceiptStorage, WALEntry, WriteAheadLog};
pub use tokenization::TokenizationLedger;
pub use verification::{ProofVerifier, VerificationResult};
