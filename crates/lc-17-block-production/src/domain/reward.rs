//! Block subsidy and coinbase construction.

use crate::error::{BlockProductionError, Result};
use shared_types::{Address, Amount, Timestamp, Transaction, COIN};

/// Subsidy of the first era.
pub const INITIAL_REWARD: Amount = 50 * COIN;

/// Blocks per halving era.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Subsidy at `height`: halves every `HALVING_INTERVAL`, zero after 64 halvings.
pub fn block_reward(height: u64) -> Amount {
    let halvings = height / HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_REWARD >> halvings
}

/// Coinbase crediting subsidy plus `fees` to `miner`.
pub fn build_coinbase(
    height: u64,
    miner: Address,
    fees: Amount,
    timestamp: Timestamp,
) -> Result<Transaction> {
    let value = block_reward(height)
        .checked_add(fees)
        .ok_or(BlockProductionError::CoinbaseOverflow { height })?;
    Ok(Transaction::coinbase(height, miner, value, timestamp))
}
