//! Property registry
//!
//! Owns the mapping from property identifier to property record. Only the
//! configured authority may register; lookups are unrestricted.

use crate::error::LedgerError;
use crate::id::{Principal, PropertyId};
use crate::objects::{Location, Property};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRegistry {
    /// The single identity allowed to register properties
    authority: Principal,

    /// Identifier handed to the next registration
    next_id: PropertyId,

    /// Registered properties by identifier
    properties: BTreeMap<PropertyId, Property>,
}

impl PropertyRegistry {
    /// Create an empty registry governed by `authority`
    pub fn new(authority: Principal) -> Self {
        Self {
            authority,
            next_id: 0,
            properties: BTreeMap::new(),
        }
    }

    pub fn authority(&self) -> &Principal {
        &self.authority
    }

    /// Register a new property
    ///
    /// # Parameters
    /// * `caller` - The identity submitting the registration
    /// * `price` - Fixed price recorded for the property
    /// * `location` - ASCII location, at most `MAX_LOCATION_LEN` bytes
    ///
    /// # Returns
    /// The identifier assigned to the new property
    pub fn register(
        &mut self,
        caller: &Principal,
        price: u64,
        location: &str,
    ) -> Result<PropertyId, LedgerError> {
        if *caller != self.authority {
            return Err(LedgerError::Unauthorized {
                caller: *caller,
                required: self.authority,
            });
        }
        let location = Location::new(location)?;

        let id = self.next_id;
        self.properties.insert(
            id,
            Property {
                id,
                owner: *caller,
                price,
                location,
                tokenized: false,
            },
        );
        self.next_id += 1;
        Ok(id)
    }

    /// Look up a property by identifier
    pub fn get_property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(&id)
    }

    /// Number of registered properties, which is also the next identifier
    pub fn property_count(&self) -> u64 {
        self.next_id
    }

    /// Iterate over all properties in identifier order
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    // Only the tokenization ledger flips the flag, after it has validated the call.
    pub(crate) fn mark_tokenized(&mut self, id: PropertyId) -> Result<(), LedgerError> {
        let property = self
            .properties
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        property.tokenized = true;
        Ok(())
    }

    pub(crate) fn from_parts(
        authority: Principal,
        next_id: PropertyId,
        properties: Vec<Property>,
    ) -> Self {
        Self {
            authority,
            next_id,
            properties: properties.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}
