//! Permanent removal registry shared by slashing and validator selection.

use super::slashing::MisbehaviorType;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Misbehavior that pushed the validator over the threshold.
    pub reason: MisbehaviorType,
    pub at: Timestamp,
}

#[derive(Debug, Default)]
pub struct TombstoneRegistry {
    entries: RwLock<HashMap<Address, Tombstone>>,
}

impl TombstoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the validator was already tombstoned; the first
    /// tombstone is kept.
    pub fn tombstone(&self, validator: Address, reason: MisbehaviorType, at: Timestamp) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&validator) {
            return false;
        }
        entries.insert(validator, Tombstone { reason, at });
        true
    }

    pub fn is_tombstoned(&self, validator: &Address) -> bool {
        self.entries.read().contains_key(validator)
    }

    pub fn get(&self, validator: &Address) -> Option<Tombstone> {
        self.entries.read().get(validator).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_is_permanent_and_first_wins() {
        let registry = TombstoneRegistry::new();
        assert!(registry.tombstone([1; 20], MisbehaviorType::Offline, 10));
        assert!(!registry.tombstone([1; 20], MisbehaviorType::DoubleSigning, 20));
        assert!(registry.is_tombstoned(&[1; 20]));
        assert!(!registry.is_tombstoned(&[2; 20]));
        assert_eq!(
            registry.get(&[1; 20]),
            Some(Tombstone {
                reason: MisbehaviorType::Offline,
                at: 10
            })
        );
        assert_eq!(registry.len(), 1);
    }
}
