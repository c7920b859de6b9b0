//! Domain layer for block production

pub mod miner;
pub mod pow;
pub mod reward;
pub mod selector;

pub use miner::{BlockAssembler, BlockTemplate, MinedBlock, MiningControl, PowMiner};
pub use pow::{check_header_pow, meets_difficulty, meets_target, target};
pub use reward::{block_reward, build_coinbase, HALVING_INTERVAL, INITIAL_REWARD};
pub use selector::{Selection, TransactionSelector};
