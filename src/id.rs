use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// Sequential identifier of a registered property.
pub type PropertyId = u64;

// Principal identifies a caller of the ledger.
// It is a 32 byte long identifier, resembling a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal([u8; 32]);

impl Default for Principal {
    fn default() -> Self {
        Principal([0; 32])
    }
}

impl Deref for Principal {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Principal {
    pub fn new(key: [u8; 32]) -> Self {
        Principal(key)
    }

    /// Derive a principal from a seed
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"ESTATE_Principal");
        hasher.update(seed);

        Principal(hasher.finalize().into())
    }

    /// Parse a principal from its 64 character hex form
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s.trim()).map_err(|e| format!("invalid principal hex: {}", e))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("principal must be 32 bytes, got {}", b.len()))?;
        Ok(Principal(key))
    }
}
