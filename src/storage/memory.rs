use crate::error::StorageError;
use crate::proofs::SlotNumber;
use crate::runtime::{TransactionHash, TransactionReceipt};
use crate::storage_traits::{ReceiptIterator, TransactionReceiptStorage};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory receipt storage indexed by transaction hash and by slot
#[derive(Default)]
pub struct InMemoryReceiptStorage {
    receipts: Mutex<HashMap<TransactionHash, TransactionReceipt>>,
    slots: Mutex<HashMap<SlotNumber, Vec<TransactionHash>>>,
}

impl InMemoryReceiptStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Receipts are only inserted whole, so a poisoned map is still consistent.
    fn receipts(&self) -> MutexGuard<'_, HashMap<TransactionHash, TransactionReceipt>> {
        self.receipts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SlotNumber, Vec<TransactionHash>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionReceiptStorage for InMemoryReceiptStorage {
    fn store_receipt(&self, receipt: &TransactionReceipt) -> Result<(), StorageError> {
        let mut receipts = self.receipts();
        let mut slots = self.slots();

        if receipts
            .insert(receipt.transaction_hash, receipt.clone())
            .is_none()
        {
            slots
                .entry(receipt.slot)
                .or_default()
                .push(receipt.transaction_hash);
        }
        Ok(())
    }

    fn get_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<Option<TransactionReceipt>, StorageError> {
        Ok(self.receipts().get(hash).cloned())
    }

    fn get_receipts_in_slot(&self, slot: SlotNumber) -> Box<dyn ReceiptIterator + '_> {
        let receipts = self.receipts();
        let mut collected: Vec<TransactionReceipt> = self
            .slots()
            .get(&slot)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| receipts.get(hash).cloned())
                    .collect()
            })
            .unwrap_or_default();

        collected.sort_by_key(|receipt| receipt.index);
        Box::new(InMemoryReceiptIterator {
            receipts: collected
                .into_iter()
                .map(Ok)
                .collect::<Vec<Result<TransactionReceipt, StorageError>>>()
                .into_iter(),
        })
    }
}

/// Iterator over receipts collected from in-memory storage
pub struct InMemoryReceiptIterator {
    receipts: std::vec::IntoIter<Result<TransactionReceipt, StorageError>>,
}

impl Iterator for InMemoryReceiptIterator {
    type Item = Result<TransactionReceipt, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receipts.next()
    }
}

impl ReceiptIterator for InMemoryReceiptIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CommitmentLevel;
    use crate::state::CallOutput;

    fn create_receipt(hash_byte: u8, slot: SlotNumber, index: usize) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: [hash_byte; 32],
            slot,
            index,
            outcome: Ok(CallOutput::Bool(true)),
            timestamp: 1_700_000_000,
            commitment_level: CommitmentLevel::Committed,
        }
    }

    #[test]
    fn test_store_and_get_receipt() {
        let storage = InMemoryReceiptStorage::new();
        let receipt = create_receipt(1, 2, 0);
        storage.store_receipt(&receipt).unwrap();

        assert_eq!(storage.get_receipt(&[1u8; 32]).unwrap(), Some(receipt));
        assert_eq!(storage.get_receipt(&[2u8; 32]).unwrap(), None);
    }

    #[test]
    fn test_receipts_in_slot_are_ordered() {
        let storage = InMemoryReceiptStorage::new();
        storage.store_receipt(&create_receipt(3, 2, 1)).unwrap();
        storage.store_receipt(&create_receipt(4, 2, 0)).unwrap();
        storage.store_receipt(&create_receipt(5, 3, 0)).unwrap();

        let slot_two: Vec<_> = storage
            .get_receipts_in_slot(2)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(slot_two.len(), 2);
        assert_eq!(slot_two[0].transaction_hash, [4u8; 32]);
        assert_eq!(slot_two[1].transaction_hash, [3u8; 32]);

        assert_eq!(storage.get_receipts_in_slot(9).count(), 0);
    }

    #[test]
    fn test_storage_survives_poisoned_lock() {
        let storage = InMemoryReceiptStorage::new();
        storage.store_receipt(&create_receipt(1, 2, 0)).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = storage.receipts.lock().unwrap();
            panic!("writer died holding the receipt lock");
        }));
        assert!(result.is_err());
        assert!(storage.receipts.is_poisoned());

        storage.store_receipt(&create_receipt(2, 2, 1)).unwrap();
        assert!(storage.get_receipt(&[1u8; 32]).unwrap().is_some());
        assert_eq!(storage.get_receipts_in_slot(2).count(), 2);
    }
}
