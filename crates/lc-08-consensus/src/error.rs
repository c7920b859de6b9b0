//! Error types for the consensus subsystem.

use lc_04_state_management::StateError;
use lc_06_mempool::Reject;
use lc_17_block_production::BlockProductionError;
use shared_types::{short_hex, Amount, Hash, StorageError, Timestamp};
use thiserror::Error;

/// Why a single block is not acceptable on top of its parent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockValidationError {
    #[error("genesis block does not match the configured genesis")]
    GenesisMismatch,

    #[error("expected index {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("previous hash does not link to parent {}", short_hex(.parent))]
    BrokenLink { parent: Hash },

    #[error("merkle root does not match transactions")]
    MerkleMismatch,

    #[error("header hash does not match header fields")]
    HashMismatch,

    #[error("difficulty {actual}, network requires {expected}")]
    DifficultyMismatch { expected: u32, actual: u32 },

    #[error("hash does not meet difficulty {difficulty}")]
    InsufficientWork { difficulty: u32 },

    #[error("timestamp {block} earlier than parent {parent}")]
    TimestampRegression { block: Timestamp, parent: Timestamp },

    #[error("timestamp {block} too far ahead of local clock {now}")]
    TimestampInFuture { block: Timestamp, now: Timestamp },

    #[error("block of {bytes} bytes exceeds {limit}")]
    Oversized { bytes: usize, limit: usize },

    #[error("{count} transactions exceed the limit of {limit}")]
    TooManyTransactions { count: usize, limit: usize },

    #[error("first transaction is not a coinbase")]
    MissingCoinbase,

    #[error("coinbase tagged for height {actual}, block is {expected}")]
    CoinbaseHeight { expected: u64, actual: u64 },

    #[error("coinbase pays {actual}, expected reward plus fees {expected}")]
    CoinbaseAmount { expected: Amount, actual: Amount },

    #[error("fee total overflows")]
    FeeOverflow,

    #[error("transaction {} appears twice", short_hex(.0))]
    DuplicateTransaction(Hash),

    #[error("bad signature on transaction {}", short_hex(.txid))]
    InvalidSignature { txid: Hash },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Consensus subsystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Invalid block at height {height}: {reason}")]
    InvalidBlock {
        height: u64,
        reason: BlockValidationError,
    },

    #[error("Candidate chain of {candidate} blocks is not longer than {current}")]
    NotLonger { candidate: usize, current: usize },

    #[error("Candidate rewrites finalized block {} at height {height}", short_hex(.finalized))]
    FinalityViolation { height: u64, finalized: Hash },

    #[error("Candidate chain is empty")]
    EmptyChain,

    #[error("Block {index} does not extend tip {tip}")]
    Detached { index: u64, tip: u64 },

    #[error("Tip moved while mining: built on {}, tip is {}", short_hex(.expected), short_hex(.actual))]
    StaleTip { expected: Hash, actual: Hash },

    #[error("Transaction rejected: {0}")]
    Admission(#[from] Reject),

    #[error(transparent)]
    Production(#[from] BlockProductionError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Recovery failed: {0}")]
    Recovery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChainError {
    pub(crate) fn invalid(height: u64, reason: impl Into<BlockValidationError>) -> Self {
        Self::InvalidBlock {
            height,
            reason: reason.into(),
        }
    }
}

/// Result type for consensus operations.
pub type ChainResult<T> = Result<T, ChainError>;
