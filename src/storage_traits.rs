use crate::error::StorageError;
use crate::proofs::SlotNumber;
use crate::runtime::{Transaction, TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};
use std::iter::Iterator;
use std::path::Path;

/// Iterator for traversing transaction receipts in storage
pub trait ReceiptIterator: Iterator<Item = Result<TransactionReceipt, StorageError>> {}

/// Storage interface for transaction receipts
pub trait TransactionReceiptStorage {
    /// Store a transaction receipt
    ///
    /// # Parameters
    /// * `receipt` - The transaction receipt to store
    ///
    /// # Returns
    /// Ok(()) if successful, Err otherwise
    fn store_receipt(&self, receipt: &TransactionReceipt) -> Result<(), StorageError>;

    /// Get a transaction receipt by transaction hash
    ///
    /// # Parameters
    /// * `hash` - The transaction hash to get the receipt for
    ///
    /// # Returns
    /// Some(receipt) if found, None otherwise
    fn get_receipt(&self, hash: &TransactionHash)
        -> Result<Option<TransactionReceipt>, StorageError>;

    /// Get all transaction receipts in a specific slot
    ///
    /// # Parameters
    /// * `slot` - The slot to get receipts for
    ///
    /// # Returns
    /// An iterator that yields all receipts in this slot, in execution order
    fn get_receipts_in_slot(&self, slot: SlotNumber) -> Box<dyn ReceiptIterator + '_>;
}

/// A write-ahead log entry for one mined block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WALEntry {
    /// The slot (block height) of the block
    pub slot: SlotNumber,

    /// The transactions of the block, in execution order
    pub transactions: Vec<Transaction>,

    /// Root of the ledger state after the block
    pub state_root: [u8; 32],

    /// Timestamp of when this block was recorded
    pub timestamp: i64,
}

/// Write-ahead log for durably recording every block before it is acknowledged
pub trait WriteAheadLog {
    /// Initialize the write-ahead log
    ///
    /// # Parameters
    /// * `path` - The file path for the write-ahead log
    ///
    /// # Returns
    /// Ok(()) if successful, Err otherwise
    fn init(&self, path: &Path) -> Result<(), StorageError>;

    /// Record a block in the write-ahead log
    ///
    /// # Parameters
    /// * `entry` - The block to append
    ///
    /// # Returns
    /// Ok(()) if successful, Err otherwise
    fn record_block(&self, entry: &WALEntry) -> Result<(), StorageError>;

    /// Get an iterator over all WAL entries
    ///
    /// # Returns
    /// An iterator that yields WALEntry instances in the order they were recorded
    fn iterate_entries(&self) -> Box<dyn Iterator<Item = Result<WALEntry, StorageError>> + '_>;
}
