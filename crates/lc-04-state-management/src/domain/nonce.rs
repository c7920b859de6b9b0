//! # Nonce Tracker
//!
//! Next expected nonce per sender. Only confirmed transactions advance it.

use super::errors::NonceError;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};
use shared_types::{Address, Hash};
use std::collections::HashMap;

const DIGEST_DOMAIN: &[u8] = b"LCNONCE\x01";

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceEntry {
    #[serde_as(as = "Hex")]
    pub address: Address,
    pub next: u64,
}

/// Sorted copy of all tracked senders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceSnapshot {
    pub entries: Vec<NonceEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct NonceTracker {
    next: HashMap<Address, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed next nonce; 0 for unknown senders.
    pub fn expected_nonce(&self, address: &Address) -> u64 {
        self.next.get(address).copied().unwrap_or(0)
    }

    pub fn validate(&self, address: &Address, nonce: u64) -> Result<(), NonceError> {
        let expected = self.expected_nonce(address);
        match nonce.cmp(&expected) {
            std::cmp::Ordering::Less => Err(NonceError::Replay {
                expected,
                actual: nonce,
            }),
            std::cmp::Ordering::Greater => Err(NonceError::Gap {
                expected,
                actual: nonce,
            }),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }

    /// Consume `nonce`. Returns the previous expected value for `revert`.
    pub fn advance(&mut self, address: &Address, nonce: u64) -> Result<u64, NonceError> {
        self.validate(address, nonce)?;
        let previous = self.expected_nonce(address);
        self.next.insert(*address, nonce + 1);
        Ok(previous)
    }

    pub fn revert(&mut self, address: &Address, previous: u64) {
        if previous == 0 {
            self.next.remove(address);
        } else {
            self.next.insert(*address, previous);
        }
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    pub fn snapshot(&self) -> NonceSnapshot {
        let mut entries: Vec<NonceEntry> = self
            .next
            .iter()
            .map(|(address, next)| NonceEntry {
                address: *address,
                next: *next,
            })
            .collect();
        entries.sort_by_key(|e| e.address);
        NonceSnapshot { entries }
    }

    pub fn restore(&mut self, snapshot: &NonceSnapshot) {
        self.next = snapshot
            .entries
            .iter()
            .map(|e| (e.address, e.next))
            .collect();
    }

    pub fn digest(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(DIGEST_DOMAIN);
        for entry in self.snapshot().entries {
            hasher.update(entry.address);
            hasher.update(entry.next.to_le_bytes());
        }
        hasher.finalize().into()
    }
}
