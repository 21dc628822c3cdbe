// Re-export the storage traits
pub use crate::storage_traits::{ReceiptIterator, TransactionReceiptStorage, WriteAheadLog};

// Export implementations
mod memory;
pub use memory::{InMemoryReceiptIterator, InMemoryReceiptStorage};

mod wal;
pub use wal::FileWriteAheadLog;
