use crate::id::{Principal, PropertyId};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Failures of a ledger call. Every variant aborts the call with no state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller lacks the role the operation requires
    /// (the registry authority for register, the owner for tokenize)
    #[error("Unauthorized: caller {caller} is not {required}")]
    Unauthorized { caller: Principal, required: Principal },

    /// The referenced property was never registered
    #[error("Property {0} not found")]
    NotFound(PropertyId),

    /// Tokenize was called on a property that already has a share supply
    #[error("Property {0} is already tokenized")]
    AlreadyTokenized(PropertyId),

    /// A purchase was attempted before the property was tokenized
    #[error("Property {0} is not tokenized")]
    NotTokenized(PropertyId),

    /// The requested quantity exceeds the remaining shares
    #[error("Insufficient supply for property {property_id}: requested {requested}, remaining {remaining}")]
    InsufficientSupply {
        property_id: PropertyId,
        requested: u64,
        remaining: u64,
    },

    /// Malformed argument (oversize location, zero supply or quantity)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub const ERR_UNAUTHORIZED: u32 = 100;
pub const ERR_NOT_FOUND: u32 = 101;
pub const ERR_INSUFFICIENT_SUPPLY: u32 = 102;
pub const ERR_ALREADY_TOKENIZED: u32 = 103;
pub const ERR_NOT_TOKENIZED: u32 = 104;
pub const ERR_INVALID_INPUT: u32 = 105;

impl LedgerError {
    /// Numeric code reported in receipts. Each condition has its own code.
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::Unauthorized { .. } => ERR_UNAUTHORIZED,
            LedgerError::NotFound(_) => ERR_NOT_FOUND,
            LedgerError::InsufficientSupply { .. } => ERR_INSUFFICIENT_SUPPLY,
            LedgerError::AlreadyTokenized(_) => ERR_ALREADY_TOKENIZED,
            LedgerError::NotTokenized(_) => ERR_NOT_TOKENIZED,
            LedgerError::InvalidInput(_) => ERR_INVALID_INPUT,
        }
    }
}

/// Serializable form of a failed call, as recorded in a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode {
    pub code: u32,
    pub message: String,
}

impl From<&LedgerError> for ErrorCode {
    fn from(err: &LedgerError) -> Self {
        ErrorCode {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Represents all possible errors raised by the journal, receipt storage and configuration
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO errors that occur when reading/writing files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to missing data
    #[error("Not found: {0}")]
    NotFound(String),

    /// Errors that occur during write-ahead log operations
    #[error("Write-ahead log error: {0}")]
    WAL(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors when a state proof chain validation fails
    #[error("Proof chain validation failed: {0}")]
    ProofChainInvalid(String),

    /// A block carried a transaction that was already committed
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Generic errors that don't fit in other categories
    #[error("Other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        StorageError::Other(err)
    }
}
