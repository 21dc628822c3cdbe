//! Ledger state and call dispatch
//!
//! `LedgerState` is the single object holding the registry and the
//! tokenization ledger. Every mutation enters through [`LedgerState::apply`].

use crate::config::LedgerConfig;
use crate::error::{LedgerError, StorageError};
use crate::id::{Principal, PropertyId};
use crate::objects::{Property, ShareSupply};
use crate::registry::PropertyRegistry;
use crate::tokenization::TokenizationLedger;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// A mutating call submitted to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    Register { price: u64, location: String },
    Tokenize { property_id: PropertyId, total_supply: u64 },
    BuyTokens { property_id: PropertyId, quantity: u64 },
}

/// Success payload of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutput {
    PropertyId(PropertyId),
    Bool(bool),
}

/// Canonical, serializable image of the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub authority: Principal,
    pub next_id: PropertyId,
    pub properties: Vec<Property>,
    pub supplies: Vec<ShareSupply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    registry: PropertyRegistry,
    ledger: TokenizationLedger,
}

impl LedgerState {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            registry: PropertyRegistry::new(config.authority),
            ledger: TokenizationLedger::new(),
        }
    }

    /// Apply one call on behalf of `caller`
    ///
    /// On error the state is exactly as it was before the call.
    pub fn apply(&mut self, caller: &Principal, call: &Call) -> Result<CallOutput, LedgerError> {
        debug!("Applying {:?} from {}", call, caller);
        match call {
            Call::Register { price, location } => self
                .registry
                .register(caller, *price, location)
                .map(CallOutput::PropertyId),
            Call::Tokenize {
                property_id,
                total_supply,
            } => self
                .ledger
                .tokenize(&mut self.registry, caller, *property_id, *total_supply)
                .map(CallOutput::Bool),
            Call::BuyTokens {
                property_id,
                quantity,
            } => self
                .ledger
                .buy_tokens(caller, *property_id, *quantity)
                .map(CallOutput::Bool),
        }
    }

    pub fn get_property(&self, id: PropertyId) -> Option<Property> {
        self.registry.get_property(id).cloned()
    }

    pub fn get_share_supply(&self, id: PropertyId) -> Option<ShareSupply> {
        self.ledger.get_share_supply(id).copied()
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &TokenizationLedger {
        &self.ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            authority: *self.registry.authority(),
            next_id: self.registry.property_count(),
            properties: self.registry.properties().cloned().collect(),
            supplies: self.ledger.supplies().copied().collect(),
        }
    }

    /// Rebuild a state from a snapshot, checking the ledger invariants
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, StorageError> {
        let mut seen = BTreeSet::new();
        if let Some(dup) = snapshot
            .supplies
            .iter()
            .find(|s| !seen.insert(s.property_id))
        {
            return Err(StorageError::Other(format!(
                "property {} has more than one share supply",
                dup.property_id
            )));
        }
        for (expected, property) in snapshot.properties.iter().enumerate() {
            if property.id != expected as PropertyId {
                return Err(StorageError::Other(format!(
                    "property ids are not sequential at {}",
                    property.id
                )));
            }
            let has_supply = snapshot
                .supplies
                .iter()
                .any(|s| s.property_id == property.id);
            if has_supply != property.tokenized {
                return Err(StorageError::Other(format!(
                    "property {} tokenized flag does not match its share supply",
                    property.id
                )));
            }
        }
        if snapshot.next_id != snapshot.properties.len() as PropertyId {
            return Err(StorageError::Other(format!(
                "next id {} does not follow {} properties",
                snapshot.next_id,
                snapshot.properties.len()
            )));
        }
        if let Some(bad) = snapshot
            .supplies
            .iter()
            .find(|s| s.total_supply == 0 || s.remaining > s.total_supply)
        {
            return Err(StorageError::Other(format!(
                "share supply of property {} is out of bounds",
                bad.property_id
            )));
        }
        if let Some(orphan) = snapshot
            .supplies
            .iter()
            .find(|s| s.property_id >= snapshot.next_id)
        {
            return Err(StorageError::Other(format!(
                "share supply references unknown property {}",
                orphan.property_id
            )));
        }

        Ok(Self {
            registry: PropertyRegistry::from_parts(
                snapshot.authority,
                snapshot.next_id,
                snapshot.properties,
            ),
            ledger: TokenizationLedger::from_supplies(snapshot.supplies),
        })
    }

    /// SHA-256 of the bincode encoded snapshot
    pub fn state_root(&self) -> Result<[u8; 32], StorageError> {
        let encoded = bincode::serialize(&self.snapshot())?;
        Ok(Sha256::digest(&encoded).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::tests::principal;

    fn new_state() -> (LedgerState, Principal) {
        let authority = principal("deployer");
        (LedgerState::new(&LedgerConfig::new(authority)), authority)
    }

    fn register(location: &str) -> Call {
        Call::Register {
            price: 100_000,
            location: location.to_string(),
        }
    }

    #[test]
    fn test_walkthrough() {
        let (mut state, authority) = new_state();
        let user = principal("wallet_1");

        assert_eq!(
            state.apply(&authority, &register("123 Main St")).unwrap(),
            CallOutput::PropertyId(0)
        );
        assert!(matches!(
            state.apply(&user, &register("456 Elm St")),
            Err(LedgerError::Unauthorized { .. })
        ));

        let tokenize = Call::Tokenize {
            property_id: 0,
            total_supply: 1000,
        };
        assert_eq!(state.apply(&authority, &tokenize).unwrap(), CallOutput::Bool(true));
        assert_eq!(state.get_share_supply(0).unwrap().remaining, 1000);

        // Non-owner on a fresh property
        state.apply(&authority, &register("101 Pine St")).unwrap();
        let err = state
            .apply(
                &user,
                &Call::Tokenize {
                    property_id: 1,
                    total_supply: 1000,
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), 100);
        assert!(state.get_share_supply(1).is_none());

        let before = state.clone();
        let err = state
            .apply(
                &user,
                &Call::BuyTokens {
                    property_id: 0,
                    quantity: 1001,
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), 102);
        assert_eq!(state, before);

        state
            .apply(
                &user,
                &Call::BuyTokens {
                    property_id: 0,
                    quantity: 10,
                },
            )
            .unwrap();
        assert_eq!(state.get_share_supply(0).unwrap().remaining, 990);
    }

    #[test]
    fn test_failed_calls_leave_state_unchanged() {
        let (mut state, authority) = new_state();
        state.apply(&authority, &register("202 Maple St")).unwrap();
        state
            .apply(
                &authority,
                &Call::Tokenize {
                    property_id: 0,
                    total_supply: 10,
                },
            )
            .unwrap();
        let before = state.clone();
        let root_before = state.state_root().unwrap();

        let failing = vec![
            (principal("wallet_1"), register("x")),
            (authority, register(&"x".repeat(300))),
            (
                authority,
                Call::Tokenize {
                    property_id: 0,
                    total_supply: 10,
                },
            ),
            (
                authority,
                Call::Tokenize {
                    property_id: 9,
                    total_supply: 10,
                },
            ),
            (
                authority,
                Call::BuyTokens {
                    property_id: 5,
                    quantity: 1,
                },
            ),
            (
                authority,
                Call::BuyTokens {
                    property_id: 0,
                    quantity: 0,
                },
            ),
        ];
        for (caller, call) in &failing {
            assert!(state.apply(caller, call).is_err(), "{:?} should fail", call);
        }

        assert_eq!(state, before);
        assert_eq!(state.state_root().unwrap(), root_before);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let (mut state, authority) = new_state();
        state.apply(&authority, &register("505 Willow St")).unwrap();

        assert_eq!(state.get_property(0), state.get_property(0));
        assert_eq!(state.get_share_supply(0), state.get_share_supply(0));
        assert_eq!(state.state_root().unwrap(), state.state_root().unwrap());
    }

    #[test]
    fn test_snapshot_restores_state() {
        let (mut state, authority) = new_state();
        state.apply(&authority, &register("a")).unwrap();
        state.apply(&authority, &register("b")).unwrap();
        state
            .apply(
                &authority,
                &Call::Tokenize {
                    property_id: 1,
                    total_supply: 50,
                },
            )
            .unwrap();

        let restored = LedgerState::from_snapshot(state.snapshot()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_snapshot_with_orphan_supply_is_rejected() {
        let (state, _) = new_state();
        let mut snapshot = state.snapshot();
        snapshot.supplies.push(ShareSupply::new(0, 10));

        assert!(LedgerState::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_snapshot_with_duplicate_supply_is_rejected() {
        let (mut state, authority) = new_state();
        state.apply(&authority, &register("a")).unwrap();
        state
            .apply(
                &authority,
                &Call::Tokenize {
                    property_id: 0,
                    total_supply: 50,
                },
            )
            .unwrap();

        let mut snapshot = state.snapshot();
        let mut partly_sold = snapshot.supplies[0];
        partly_sold.remaining = 20;
        snapshot.supplies.push(partly_sold);

        let err = LedgerState::from_snapshot(snapshot).unwrap_err();
        assert!(err.to_string().contains("more than one share supply"));
    }

    #[test]
    fn test_snapshot_decode_rejects_bad_location() {
        let (mut state, authority) = new_state();
        state.apply(&authority, &register("a")).unwrap();

        let mut json = serde_json::to_value(state.snapshot()).unwrap();
        json["properties"][0]["location"] = serde_json::Value::from("x".repeat(300));
        assert!(serde_json::from_value::<LedgerSnapshot>(json).is_err());
    }

    #[test]
    fn test_call_decodes_from_bincode() {
        let calls = vec![
            register("123 Main St"),
            Call::Tokenize {
                property_id: 0,
                total_supply: 1000,
            },
            Call::BuyTokens {
                property_id: 0,
                quantity: 10,
            },
        ];
        let encoded = bincode::serialize(&calls).unwrap();
        let decoded: Vec<Call> = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, calls);
    }
}
