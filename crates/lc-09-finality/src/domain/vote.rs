//! # Votes and Certificates
//!
//! A vote is an Ed25519 signature over
//! `b"LCVOTE\x01" || height (u64 BE) || block_hash`. One tally exists per
//! `(height, block_hash)` and moves `NoVotes -> PartialQuorum -> Finalized`.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_crypto::Ed25519KeyPair;
use shared_types::{Address, BlockHeader, Hash, Signature, Timestamp};
use std::collections::BTreeSet;

pub const VOTE_DOMAIN: &[u8] = b"LCVOTE\x01";

/// Bytes a validator signs to vote for `header`.
pub fn build_vote_payload(header: &BlockHeader) -> Vec<u8> {
    vote_payload_for(header.index, &header.hash)
}

pub fn vote_payload_for(height: u64, block_hash: &Hash) -> Vec<u8> {
    let mut payload = Vec::with_capacity(VOTE_DOMAIN.len() + 8 + 32);
    payload.extend_from_slice(VOTE_DOMAIN);
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(block_hash);
    payload
}

/// Vote for `header` signed with `keys`.
pub fn sign_vote(keys: &Ed25519KeyPair, header: &BlockHeader) -> Signature {
    keys.sign(&build_vote_payload(header)).to_bytes()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TallyState {
    NoVotes,
    PartialQuorum,
    Finalized,
}

/// Accumulated power for one `(height, block_hash)`.
#[derive(Clone, Debug, Default)]
pub struct VoteTally {
    voters: BTreeSet<Address>,
    power: u64,
}

impl VoteTally {
    /// Returns false if `voter` was already counted.
    pub fn add(&mut self, voter: Address, power: u64) -> bool {
        if !self.voters.insert(voter) {
            return false;
        }
        self.power = self.power.saturating_add(power);
        true
    }

    pub fn power(&self) -> u64 {
        self.power
    }

    pub fn voters(&self) -> impl Iterator<Item = &Address> {
        self.voters.iter()
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }
}

/// Strict quorum: `power / total > numerator / denominator`.
pub fn exceeds_quorum(power: u64, total: u64, numerator: u64, denominator: u64) -> bool {
    total > 0 && power as u128 * denominator as u128 > total as u128 * numerator as u128
}

/// Proof that a block gathered a quorum of votes.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityCertificate {
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub block_hash: Hash,
    #[serde_as(as = "Vec<Hex>")]
    pub voters: Vec<Address>,
    pub voting_power: u64,
    pub total_power: u64,
    pub created_at: Timestamp,
}
