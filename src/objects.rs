use crate::error::LedgerError;
use crate::id::{Principal, PropertyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length in bytes of a property location
pub const MAX_LOCATION_LEN: usize = 256;

// Location is bounded ASCII text, checked once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    pub fn new(text: impl Into<String>) -> Result<Self, LedgerError> {
        let text = text.into();
        if !text.is_ascii() {
            return Err(LedgerError::InvalidInput(
                "location must be ASCII".to_string(),
            ));
        }
        if text.len() > MAX_LOCATION_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "location is {} bytes, maximum is {}",
                text.len(),
                MAX_LOCATION_LEN
            )));
        }
        Ok(Location(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Location {
    type Error = LedgerError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Location::new(text)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// A registered property. Only `tokenized` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner: Principal,
    pub price: u64,
    pub location: Location,
    pub tokenized: bool,
}

// Share pool created by tokenization; `remaining` only ever decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSupply {
    pub property_id: PropertyId,
    pub total_supply: u64,
    pub remaining: u64,
}

impl ShareSupply {
    pub fn new(property_id: PropertyId, total_supply: u64) -> Self {
        Self {
            property_id,
            total_supply,
            remaining: total_supply,
        }
    }

    pub fn sold(&self) -> u64 {
        self.total_supply.saturating_sub(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_bounds() {
        assert!(Location::new("123 Main St").is_ok());
        assert!(Location::new("a".repeat(MAX_LOCATION_LEN)).is_ok());

        let err = Location::new("a".repeat(MAX_LOCATION_LEN + 1)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_location_rejects_non_ascii() {
        let err = Location::new("Straße 5").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn test_new_supply_is_unsold() {
        let supply = ShareSupply::new(3, 1000);
        assert_eq!(supply.remaining, 1000);
        assert_eq!(supply.sold(), 0);
    }

    #[test]
    fn test_sold_saturates_on_inconsistent_supply() {
        let supply = ShareSupply {
            property_id: 0,
            total_supply: 10,
            remaining: 25,
        };
        assert_eq!(supply.sold(), 0);
    }

    #[test]
    fn test_location_is_checked_on_decode() {
        let ok: Location = serde_json::from_str("\"123 Main St\"").unwrap();
        assert_eq!(ok.as_str(), "123 Main St");

        let long = format!("\"{}\"", "a".repeat(MAX_LOCATION_LEN + 1));
        assert!(serde_json::from_str::<Location>(&long).is_err());
        assert!(serde_json::from_str::<Location>("\"Straße 5\"").is_err());

        let encoded = bincode::serialize(&"Straße 5".to_string()).unwrap();
        assert!(bincode::deserialize::<Location>(&encoded).is_err());
    }
}
