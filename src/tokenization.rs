//! Tokenization ledger
//!
//! Tracks the share supply of each tokenized property. A property is
//! tokenized at most once, by its owner; purchases draw down `remaining`
//! and are all-or-nothing.

use crate::error::LedgerError;
use crate::id::{Principal, PropertyId};
use crate::objects::ShareSupply;
use crate::registry::PropertyRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationLedger {
    supplies: BTreeMap<PropertyId, ShareSupply>,
}

impl TokenizationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a registered property into a fixed pool of shares
    ///
    /// All preconditions are checked before either record is written, so a
    /// failed call leaves both the registry and the ledger untouched.
    ///
    /// # Parameters
    /// * `registry` - Registry holding the property
    /// * `caller` - Must be the property's owner
    /// * `property_id` - The property to tokenize
    /// * `total_supply` - Number of shares, must be positive
    ///
    /// # Returns
    /// `true` on success; failures are reported as errors
    pub fn tokenize(
        &mut self,
        registry: &mut PropertyRegistry,
        caller: &Principal,
        property_id: PropertyId,
        total_supply: u64,
    ) -> Result<bool, LedgerError> {
        let property = registry
            .get_property(property_id)
            .ok_or(LedgerError::NotFound(property_id))?;
        if property.owner != *caller {
            return Err(LedgerError::Unauthorized {
                caller: *caller,
                required: property.owner,
            });
        }
        if property.tokenized || self.supplies.contains_key(&property_id) {
            return Err(LedgerError::AlreadyTokenized(property_id));
        }
        if total_supply == 0 {
            return Err(LedgerError::InvalidInput(
                "total supply must be positive".to_string(),
            ));
        }

        registry.mark_tokenized(property_id)?;
        self.supplies
            .insert(property_id, ShareSupply::new(property_id, total_supply));
        Ok(true)
    }

    /// Purchase `quantity` of the remaining shares of a property
    ///
    /// Any caller may buy, including the owner. Holdings per buyer are not tracked.
    pub fn buy_tokens(
        &mut self,
        _caller: &Principal,
        property_id: PropertyId,
        quantity: u64,
    ) -> Result<bool, LedgerError> {
        let supply = self
            .supplies
            .get_mut(&property_id)
            .ok_or(LedgerError::NotTokenized(property_id))?;
        if quantity == 0 {
            return Err(LedgerError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }
        if quantity > supply.remaining {
            return Err(LedgerError::InsufficientSupply {
                property_id,
                requested: quantity,
                remaining: supply.remaining,
            });
        }

        supply.remaining -= quantity;
        Ok(true)
    }

    pub fn get_share_supply(&self, property_id: PropertyId) -> Option<&ShareSupply> {
        self.supplies.get(&property_id)
    }

    pub fn supplies(&self) -> impl Iterator<Item = &ShareSupply> {
        self.supplies.values()
    }

    pub(crate) fn from_supplies(supplies: Vec<ShareSupply>) -> Self {
        Self {
            supplies: supplies.into_iter().map(|s| (s.property_id, s)).collect(),
        }
    }
}
