use crate::error::StorageError;
use crate::storage_traits::{WALEntry, WriteAheadLog};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Upper bound on a single encoded entry, to reject a corrupt length prefix
const MAX_ENTRY_LEN: u64 = 64 * 1024 * 1024;

/// A file-based write-ahead log of mined blocks
///
/// Each entry is a little-endian `u64` length followed by the bincode
/// encoding of a [`WALEntry`]. The writer is flushed after every entry.
pub struct FileWriteAheadLog {
    /// Path to the WAL file
    path: Arc<Mutex<Option<PathBuf>>>,

    /// File handle for writing
    file: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl Default for FileWriteAheadLog {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWriteAheadLog {
    /// Create a new, uninitialized WAL
    pub fn new() -> Self {
        Self {
            path: Arc::new(Mutex::new(None)),
            file: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a WAL and initialize it at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let wal = Self::new();
        wal.init(path)?;
        Ok(wal)
    }
}

impl WriteAheadLog for FileWriteAheadLog {
    fn init(&self, path: &Path) -> Result<(), StorageError> {
        let mut file_guard = self
            .file
            .lock()
            .map_err(|e| StorageError::WAL(format!("Failed to acquire lock: {}", e)))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::WAL(format!("Failed to open WAL file: {}", e)))?;
        *file_guard = Some(BufWriter::new(file));

        let mut path_guard = self
            .path
            .lock()
            .map_err(|e| StorageError::WAL(format!("Failed to acquire path lock: {}", e)))?;
        *path_guard = Some(path.to_path_buf());

        debug!("Write-ahead log opened at {}", path.display());
        Ok(())
    }

    fn record_block(&self, entry: &WALEntry) -> Result<(), StorageError> {
        let mut file_guard = self
            .file
            .lock()
            .map_err(|e| StorageError::WAL(format!("Failed to acquire lock: {}", e)))?;

        let file = file_guard
            .as_mut()
            .ok_or_else(|| StorageError::WAL("WAL has not been initialized".to_string()))?;

        let serialized = bincode::serialize(entry)?;

        let entry_len = serialized.len() as u64;
        file.write_all(&entry_len.to_le_bytes())?;
        file.write_all(&serialized)?;
        file.flush()?;

        debug!(
            "Recorded block {} ({} transactions) in WAL",
            entry.slot,
            entry.transactions.len()
        );
        Ok(())
    }

    fn iterate_entries(&self) -> Box<dyn Iterator<Item = Result<WALEntry, StorageError>> + '_> {
        let path = match self.path.lock() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                return Box::new(std::iter::once(Err(StorageError::WAL(format!(
                    "Failed to acquire path lock: {}",
                    e
                )))))
            }
        };
        let Some(path) = path else {
            return Box::new(std::iter::once(Err(StorageError::WAL(
                "WAL has not been initialized".to_string(),
            ))));
        };

        match File::open(&path) {
            Ok(file) => Box::new(WALEntryIterator {
                reader: BufReader::new(file),
                done: false,
            }),
            Err(e) => Box::new(std::iter::once(Err(StorageError::from(e)))),
        }
    }
}

/// Iterator over WAL entries
struct WALEntryIterator {
    reader: BufReader<File>,
    done: bool,
}

impl Iterator for WALEntryIterator {
    type Item = Result<WALEntry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut len_buf = [0u8; 8];
        match self.reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(StorageError::from(e)));
            }
        }

        let entry_len = u64::from_le_bytes(len_buf);
        if entry_len > MAX_ENTRY_LEN {
            self.done = true;
            return Some(Err(StorageError::WAL(format!(
                "Entry length {} exceeds maximum",
                entry_len
            ))));
        }

        let mut entry_data = vec![0u8; entry_len as usize];
        if let Err(e) = self.reader.read_exact(&mut entry_data) {
            self.done = true;
            return Some(Err(StorageError::from(e)));
        }

        match bincode::deserialize(&entry_data) {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.done = true;
                Some(Err(StorageError::from(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::tests::principal;
    use crate::runtime::Transaction;
    use crate::state::Call;
    use tempfile::tempdir;

    fn create_test_entry(slot: u64) -> WALEntry {
        WALEntry {
            slot,
            transactions: vec![Transaction::new(
                principal("deployer"),
                Call::Register {
                    price: 100_000,
                    location: format!("{} Main St", slot),
                },
                slot,
            )],
            state_root: [slot as u8; 32],
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_wal_records_blocks_in_order() {
        let temp_dir = tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let wal = FileWriteAheadLog::open(&wal_path).unwrap();
        let first = create_test_entry(2);
        let second = create_test_entry(3);
        wal.record_block(&first).unwrap();
        wal.record_block(&second).unwrap();

        let entries: Vec<_> = wal
            .iterate_entries()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[test]
    fn test_wal_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let wal_path = temp_dir.path().join("reopen.wal");

        {
            let wal = FileWriteAheadLog::open(&wal_path).unwrap();
            wal.record_block(&create_test_entry(2)).unwrap();
        }

        let wal = FileWriteAheadLog::open(&wal_path).unwrap();
        wal.record_block(&create_test_entry(3)).unwrap();

        let slots: Vec<u64> = wal
            .iterate_entries()
            .map(|entry| entry.unwrap().slot)
            .collect();
        assert_eq!(slots, vec![2, 3]);
    }

    #[test]
    fn test_uninitialized_wal() {
        let wal = FileWriteAheadLog::new();
        assert!(matches!(
            wal.record_block(&create_test_entry(2)),
            Err(StorageError::WAL(_))
        ));
        assert!(wal.iterate_entries().next().unwrap().is_err());
    }

    #[test]
    fn test_truncated_entry_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let wal_path = temp_dir.path().join("truncated.wal");

        let wal = FileWriteAheadLog::open(&wal_path).unwrap();
        wal.record_block(&create_test_entry(2)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(&100u64.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let results: Vec<_> = wal.iterate_entries().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
