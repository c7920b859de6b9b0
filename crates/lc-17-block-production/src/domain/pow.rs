//! Proof-of-work target checks.
//!
//! Difficulty counts required leading zero bits: a hash meets difficulty `d`
//! when `U256(hash) <= U256::MAX >> d`.

use crate::config::MAX_DIFFICULTY;
use primitive_types::U256;
use shared_types::{BlockHeader, Hash};

/// Largest hash value accepted at `difficulty`.
pub fn target(difficulty: u32) -> U256 {
    if difficulty > MAX_DIFFICULTY {
        return U256::zero();
    }
    U256::MAX >> difficulty as usize
}

pub fn meets_target(hash: &Hash, target: &U256) -> bool {
    U256::from_big_endian(hash) <= *target
}

pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    meets_target(hash, &target(difficulty))
}

/// Hash matches the header fields and satisfies the header's difficulty.
pub fn check_header_pow(header: &BlockHeader) -> bool {
    header.compute_hash() == header.hash && meets_difficulty(&header.hash, header.difficulty)
}
