use crate::error::StorageError;
use crate::id::Principal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Height of a freshly deployed chain, before any block is mined
pub const DEFAULT_GENESIS_HEIGHT: u64 = 1;

/// Deployment-time configuration of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The only identity allowed to register properties
    #[serde(with = "principal_hex")]
    pub authority: Principal,

    /// Height the chain starts at; the first mined block is `genesis_height + 1`
    #[serde(default = "LedgerConfig::default_genesis_height")]
    pub genesis_height: u64,
}

impl LedgerConfig {
    fn default_genesis_height() -> u64 {
        DEFAULT_GENESIS_HEIGHT
    }

    pub fn new(authority: Principal) -> Self {
        Self {
            authority,
            genesis_height: DEFAULT_GENESIS_HEIGHT,
        }
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, StorageError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// The authority is written as hex in config files.
mod principal_hex {
    use crate::id::Principal;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(principal: &Principal, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&principal.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Principal, D::Error> {
        let text = String::deserialize(d)?;
        Principal::from_hex(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::tests::principal;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config_with_default_height() {
        let authority = principal("deployer");
        let json = format!(r#"{{ "authority": "{}" }}"#, authority);

        let config = LedgerConfig::from_json_str(&json).unwrap();
        assert_eq!(config.authority, authority);
        assert_eq!(config.genesis_height, DEFAULT_GENESIS_HEIGHT);
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let config = LedgerConfig {
            authority: principal("deployer"),
            genesis_height: 10,
        };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = LedgerConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_authority_is_config_error() {
        let err = LedgerConfig::from_json_str(r#"{ "authority": "zz" }"#).unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
