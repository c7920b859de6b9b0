//! Finality domain: votes, double-sign detection, slashing and rotation.

pub mod double_sign;
pub mod slashing;
pub mod tombstone;
pub mod validator;
pub mod validator_set;
pub mod vote;

pub use double_sign::{DoubleSignDetector, DoubleSignProof};
pub use slashing::{MisbehaviorType, SlashingHandler, SlashingManager, SlashingRecord};
pub use tombstone::{Tombstone, TombstoneRegistry};
pub use validator::ValidatorIdentity;
pub use validator_set::{ValidatorCandidate, ValidatorSetManager};
pub use vote::{
    build_vote_payload, exceeds_quorum, sign_vote, vote_payload_for, FinalityCertificate, TallyState,
    VoteTally, VOTE_DOMAIN,
};
