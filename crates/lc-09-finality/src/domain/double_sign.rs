//! # Double-Sign Detection
//!
//! Remembers the first hash each validator signed at each height.
//! Re-signing the same hash is an idempotent rebroadcast; a different hash
//! at a recorded height is a violation. Each `(validator, height)` yields at
//! most one proof, so a redelivered conflicting vote is never punished twice.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Address, Hash, Timestamp};
use std::collections::{BTreeMap, HashMap};

/// Evidence that `validator` signed two hashes at `height`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleSignProof {
    #[serde_as(as = "Hex")]
    pub validator: Address,
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub first_hash: Hash,
    #[serde_as(as = "Hex")]
    pub second_hash: Hash,
    pub detected_at: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct Signed {
    first: Hash,
    /// A proof was already issued for this height.
    convicted: bool,
}

#[derive(Debug, Default)]
pub struct DoubleSignDetector {
    /// height -> validator -> first signed hash
    signed: BTreeMap<u64, HashMap<Address, Signed>>,
    violations: u64,
}

impl DoubleSignDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature and report whether it conflicts with an earlier one.
    ///
    /// The first hash stays on record after a violation. Only the first
    /// conflict at a height carries a proof; later conflicting hashes at the
    /// same height are still reported as violations, without one.
    pub fn process_signed_block(
        &mut self,
        validator: Address,
        height: u64,
        block_hash: Hash,
        now: Timestamp,
    ) -> (bool, Option<DoubleSignProof>) {
        let at_height = self.signed.entry(height).or_default();
        match at_height.get_mut(&validator) {
            Some(signed) if signed.first == block_hash => (false, None),
            Some(signed) if signed.convicted => (true, None),
            Some(signed) => {
                signed.convicted = true;
                self.violations += 1;
                let proof = DoubleSignProof {
                    validator,
                    height,
                    first_hash: signed.first,
                    second_hash: block_hash,
                    detected_at: now,
                };
                (true, Some(proof))
            }
            None => {
                at_height.insert(
                    validator,
                    Signed {
                        first: block_hash,
                        convicted: false,
                    },
                );
                (false, None)
            }
        }
    }

    /// Hash `validator` signed at `height`, if any.
    pub fn signed_hash(&self, validator: &Address, height: u64) -> Option<Hash> {
        self.signed.get(&height)?.get(validator).map(|s| s.first)
    }

    /// Forget every record below `height`. Returns the number of heights dropped.
    pub fn prune_below(&mut self, height: u64) -> usize {
        let kept = self.signed.split_off(&height);
        let dropped = self.signed.len();
        self.signed = kept;
        dropped
    }

    pub fn tracked_heights(&self) -> usize {
        self.signed.len()
    }

    pub fn violations(&self) -> u64 {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAL: Address = [1; 20];

    #[test]
    fn test_same_hash_is_idempotent() {
        let mut detector = DoubleSignDetector::new();
        assert_eq!(detector.process_signed_block(VAL, 5, [0xAA; 32], 1), (false, None));
        assert_eq!(detector.process_signed_block(VAL, 5, [0xAA; 32], 2), (false, None));
        assert_eq!(detector.violations(), 0);
    }

    #[test]
    fn test_conflicting_hash_yields_proof() {
        let mut detector = DoubleSignDetector::new();
        detector.process_signed_block(VAL, 5, [0xAA; 32], 1);
        let (violation, proof) = detector.process_signed_block(VAL, 5, [0xBB; 32], 9);
        assert!(violation);
        let proof = proof.unwrap();
        assert_eq!(proof.first_hash, [0xAA; 32]);
        assert_eq!(proof.second_hash, [0xBB; 32]);
        assert_eq!(proof.detected_at, 9);
        assert_eq!(detector.signed_hash(&VAL, 5), Some([0xAA; 32]));
    }

    #[test]
    fn test_one_proof_per_offense() {
        let mut detector = DoubleSignDetector::new();
        detector.process_signed_block(VAL, 5, [0xAA; 32], 1);
        assert!(detector.process_signed_block(VAL, 5, [0xBB; 32], 2).1.is_some());
        // Redelivered, and a third hash: still violations, no new proof.
        assert_eq!(detector.process_signed_block(VAL, 5, [0xBB; 32], 3), (true, None));
        assert_eq!(detector.process_signed_block(VAL, 5, [0xCC; 32], 4), (true, None));
        assert_eq!(detector.process_signed_block(VAL, 5, [0xAA; 32], 5), (false, None));
        assert_eq!(detector.violations(), 1);

        // A new height is a new offense.
        detector.process_signed_block(VAL, 6, [0xAA; 32], 6);
        assert!(detector.process_signed_block(VAL, 6, [0xBB; 32], 7).1.is_some());
        assert_eq!(detector.violations(), 2);
    }

    #[test]
    fn test_heights_and_validators_are_independent() {
        let mut detector = DoubleSignDetector::new();
        detector.process_signed_block(VAL, 5, [0xAA; 32], 1);
        assert!(!detector.process_signed_block(VAL, 6, [0xBB; 32], 1).0);
        assert!(!detector.process_signed_block([2; 20], 5, [0xBB; 32], 1).0);
    }

    #[test]
    fn test_prune_below() {
        let mut detector = DoubleSignDetector::new();
        for height in 0..10 {
            detector.process_signed_block(VAL, height, [height as u8; 32], 0);
        }
        assert_eq!(detector.prune_below(7), 7);
        assert_eq!(detector.tracked_heights(), 3);
        assert_eq!(detector.signed_hash(&VAL, 6), None);
        assert_eq!(detector.signed_hash(&VAL, 7), Some([7; 32]));
    }
}
