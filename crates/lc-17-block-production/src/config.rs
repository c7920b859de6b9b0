//! Configuration types for block production

use serde::{Deserialize, Serialize};

/// Hardest difficulty accepted: leading zero bits of a 256-bit hash.
pub const MAX_DIFFICULTY: u32 = 255;

/// Runtime configuration for block production
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockProductionConfig {
    /// Required leading zero bits. 0 accepts the first nonce.
    pub difficulty: u32,

    /// Non-coinbase transactions per block.
    pub max_transactions_per_block: usize,

    /// Block size cap, header and coinbase included.
    pub max_block_size_bytes: usize,

    /// Nonces tried between stop/pause checks.
    pub nonce_batch_size: u64,

    /// Mining pause after a peer block arrives (milliseconds).
    pub mining_backoff_ms: u64,
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            difficulty: 16,
            max_transactions_per_block: 1_000,
            max_block_size_bytes: 1024 * 1024,
            nonce_batch_size: 50_000,
            mining_backoff_ms: 2_000,
        }
    }
}

impl BlockProductionConfig {
    /// Fast mode: no PoW work, short backoff.
    pub fn for_testing() -> Self {
        Self {
            difficulty: 0,
            nonce_batch_size: 1_000,
            mining_backoff_ms: 50,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(format!(
                "difficulty {} exceeds {}",
                self.difficulty, MAX_DIFFICULTY
            ));
        }
        if self.nonce_batch_size == 0 {
            return Err("nonce_batch_size must be positive".into());
        }
        if self.max_block_size_bytes == 0 {
            return Err("max_block_size_bytes must be positive".into());
        }
        Ok(())
    }
}
