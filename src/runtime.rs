use crate::config::LedgerConfig;
use crate::error::{ErrorCode, StorageError};
use crate::id::{Principal, PropertyId};
use crate::objects::{Property, ShareSupply};
use crate::proofs::{Blake3ProofEngine, ProofEngine, SlotNumber, StateProof};
use crate::state::{Call, CallOutput, LedgerState};
use crate::storage::{InMemoryReceiptStorage, TransactionReceiptStorage, WriteAheadLog};
use crate::storage_traits::WALEntry;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A transaction hash uniquely identifies a transaction in the system
pub type TransactionHash = [u8; 32];

/// Final status of a transaction within its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentLevel {
    /// The call succeeded and its effects are part of the block
    Committed,
    /// The call was rejected and had no effect
    Failed,
}

/// A call submitted by an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identity the call is executed on behalf of
    pub caller: Principal,

    /// The ledger operation to perform
    pub call: Call,

    /// Caller-chosen value distinguishing otherwise identical transactions
    pub nonce: u64,

    /// The hash of the transaction
    pub hash: TransactionHash,
}

impl Transaction {
    pub fn new(caller: Principal, call: Call, nonce: u64) -> Self {
        let hash = Self::compute_hash(&caller, &call, nonce);
        Self {
            caller,
            call,
            nonce,
            hash,
        }
    }

    /// SHA-256 over the caller, the call fields and the nonce
    pub fn compute_hash(caller: &Principal, call: &Call, nonce: u64) -> TransactionHash {
        let mut hasher = Sha256::new();
        hasher.update(b"ESTATE_Transaction");
        hasher.update(caller.as_slice());
        match call {
            Call::Register { price, location } => {
                hasher.update([0u8]);
                hasher.update(price.to_le_bytes());
                hasher.update((location.len() as u64).to_le_bytes());
                hasher.update(location.as_bytes());
            }
            Call::Tokenize {
                property_id,
                total_supply,
            } => {
                hasher.update([1u8]);
                hasher.update(property_id.to_le_bytes());
                hasher.update(total_supply.to_le_bytes());
            }
            Call::BuyTokens {
                property_id,
                quantity,
            } => {
                hasher.update([2u8]);
                hasher.update(property_id.to_le_bytes());
                hasher.update(quantity.to_le_bytes());
            }
        }
        hasher.update(nonce.to_le_bytes());
        hasher.finalize().into()
    }

    /// Whether `hash` matches the transaction's contents
    pub fn is_hash_valid(&self) -> bool {
        self.hash == Self::compute_hash(&self.caller, &self.call, self.nonce)
    }
}

/// A receipt of a processed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// The hash of the transaction that was executed
    pub transaction_hash: TransactionHash,

    /// The slot (block height) in which this transaction was processed
    pub slot: SlotNumber,

    /// Position of the transaction within its block
    pub index: usize,

    /// Success payload, or the error the call was rejected with
    pub outcome: Result<CallOutput, ErrorCode>,

    /// Timestamp (Unix seconds) when the block was processed
    pub timestamp: i64,

    /// The commitment level of this transaction
    pub commitment_level: CommitmentLevel,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.commitment_level == CommitmentLevel::Committed
    }
}

/// A mined block: one receipt per transaction, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: SlotNumber,
    pub receipts: Vec<TransactionReceipt>,
    pub state_proof: StateProof,
}

/// Host for the ledger: delivers calls in blocks and serves reads
pub trait Runtime {
    /// Execute a batch of transactions as the next block
    ///
    /// Failed calls produce failed receipts and do not stop the rest of the
    /// block. An `Err` means the block itself could not be committed, in
    /// which case nothing changed.
    fn mine_block(&self, transactions: Vec<Transaction>) -> Result<Block, StorageError>;

    /// Height of the most recently mined block (genesis height before any)
    fn height(&self) -> SlotNumber;

    fn get_property(&self, id: PropertyId) -> Option<Property>;

    fn get_share_supply(&self, id: PropertyId) -> Option<ShareSupply>;

    /// Get a receipt by transaction hash
    fn get_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<Option<TransactionReceipt>, StorageError>;
}

// Everything a block mutates, guarded by one lock.
struct Chain {
    state: LedgerState,
    height: SlotNumber,
    proofs: Vec<StateProof>,
    seen: HashSet<TransactionHash>,
}

/// In-process runtime executing blocks against a single [`LedgerState`]
pub struct LedgerRuntime {
    chain: Mutex<Chain>,
    receipts: InMemoryReceiptStorage,
    wal: Option<Box<dyn WriteAheadLog + Send + Sync>>,
    engine: Blake3ProofEngine,
}

impl LedgerRuntime {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            chain: Mutex::new(Chain {
                state: LedgerState::new(config),
                height: config.genesis_height,
                proofs: Vec::new(),
                seen: HashSet::new(),
            }),
            receipts: InMemoryReceiptStorage::new(),
            wal: None,
            engine: Blake3ProofEngine::new(),
        }
    }

    /// Create a runtime that journals every block to `wal`
    pub fn with_wal(config: &LedgerConfig, wal: Box<dyn WriteAheadLog + Send + Sync>) -> Self {
        let mut runtime = Self::new(config);
        runtime.wal = Some(wal);
        runtime
    }

    /// Rebuild a runtime by re-executing every block recorded in `wal`
    ///
    /// Each replayed block must follow the previous height and reproduce the
    /// recorded state root. The journal stays attached for new blocks.
    pub fn replay(
        config: &LedgerConfig,
        wal: Box<dyn WriteAheadLog + Send + Sync>,
    ) -> Result<Self, StorageError> {
        let runtime = Self::new(config);
        let mut replayed = 0usize;
        for entry in wal.iterate_entries() {
            let entry = entry?;
            let block = runtime.execute_block(entry.transactions.clone(), Some(entry.slot))?;
            if block.state_proof.state_root != entry.state_root {
                return Err(StorageError::WAL(format!(
                    "State root mismatch while replaying block {}",
                    entry.slot
                )));
            }
            replayed += 1;
        }
        info!(
            "Replayed {} blocks, ledger at height {}",
            replayed,
            runtime.height()
        );

        let mut runtime = runtime;
        runtime.wal = Some(wal);
        Ok(runtime)
    }

    /// All state proofs generated so far, oldest first
    pub fn state_proofs(&self) -> Result<Vec<StateProof>, StorageError> {
        Ok(self.lock_chain().proofs.clone())
    }

    /// Receipts of the block at `height`, in execution order
    pub fn receipts_in_block(
        &self,
        height: SlotNumber,
    ) -> Result<Vec<TransactionReceipt>, StorageError> {
        self.receipts.get_receipts_in_slot(height).collect()
    }

    /// A copy of the current ledger state
    pub fn state(&self) -> Result<LedgerState, StorageError> {
        Ok(self.lock_chain().state.clone())
    }

    pub fn proof_engine(&self) -> &dyn ProofEngine {
        &self.engine
    }

    // The chain is only written after every fallible step of a block, so a
    // poisoned lock still guards a committed state.
    fn lock_chain(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Runs the block against a copy of the state. Nothing is published until
    // the journal has accepted the block; after that the commit cannot fail.
    fn execute_block(
        &self,
        transactions: Vec<Transaction>,
        expected_slot: Option<SlotNumber>,
    ) -> Result<Block, StorageError> {
        let mut chain = self.lock_chain();
        let slot = chain.height + 1;
        if let Some(expected) = expected_slot {
            if expected != slot {
                return Err(StorageError::WAL(format!(
                    "Expected block {} but journal holds block {}",
                    slot, expected
                )));
            }
        }

        let mut batch_hashes = HashSet::new();
        for tx in &transactions {
            if !tx.is_hash_valid() {
                return Err(StorageError::Other(format!(
                    "Transaction hash {} does not match its contents",
                    hex::encode(tx.hash)
                )));
            }
            if chain.seen.contains(&tx.hash) || !batch_hashes.insert(tx.hash) {
                return Err(StorageError::DuplicateTransaction(hex::encode(tx.hash)));
            }
        }

        let timestamp = chrono::Utc::now().timestamp();
        let mut working = chain.state.clone();
        let mut receipts = Vec::with_capacity(transactions.len());
        for (index, tx) in transactions.iter().enumerate() {
            let outcome = working.apply(&tx.caller, &tx.call);
            let commitment_level = match &outcome {
                Ok(_) => CommitmentLevel::Committed,
                Err(e) => {
                    warn!(
                        "Transaction {} rejected in block {}: {}",
                        hex::encode(tx.hash),
                        slot,
                        e
                    );
                    CommitmentLevel::Failed
                }
            };
            receipts.push(TransactionReceipt {
                transaction_hash: tx.hash,
                slot,
                index,
                outcome: outcome.map_err(|e| ErrorCode::from(&e)),
                timestamp,
                commitment_level,
            });
        }

        let state_proof = self
            .engine
            .generate_state_proof(&working, chain.proofs.last(), slot)?;

        // Replayed blocks are already in the journal.
        if expected_slot.is_none() {
            if let Some(wal) = &self.wal {
                wal.record_block(&WALEntry {
                    slot,
                    transactions: transactions.clone(),
                    state_root: state_proof.state_root,
                    timestamp,
                })?;
            }
        }

        chain.state = working;
        chain.height = slot;
        chain.proofs.push(state_proof.clone());
        chain.seen.extend(batch_hashes);
        for receipt in &receipts {
            if let Err(e) = self.receipts.store_receipt(receipt) {
                warn!(
                    "Failed to index receipt {} of block {}: {}",
                    hex::encode(receipt.transaction_hash),
                    slot,
                    e
                );
            }
        }

        let failed = receipts.iter().filter(|r| !r.is_success()).count();
        info!(
            "Mined block {} with {} transactions ({} failed)",
            slot,
            receipts.len(),
            failed
        );

        Ok(Block {
            height: slot,
            receipts,
            state_proof,
        })
    }
}

impl Runtime for LedgerRuntime {
    fn mine_block(&self, transactions: Vec<Transaction>) -> Result<Block, StorageError> {
        self.execute_block(transactions, None)
    }

    fn height(&self) -> SlotNumber {
        self.lock_chain().height
    }

    fn get_property(&self, id: PropertyId) -> Option<Property> {
        self.lock_chain().state.get_property(id)
    }

    fn get_share_supply(&self, id: PropertyId) -> Option<ShareSupply> {
        self.lock_chain().state.get_share_supply(id)
    }

    fn get_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<Option<TransactionReceipt>, StorageError> {
        self.receipts.get_receipt(hash)
    }
}
