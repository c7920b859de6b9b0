//! Error types for block production subsystem

use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Errors that can occur during block production
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockProductionError {
    /// Mining needs an attributable key for `miner_pubkey`.
    #[error("No signing identity configured for mining")]
    MissingIdentity,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reward plus fees does not fit in an amount.
    #[error("Coinbase value overflow at height {height}")]
    CoinbaseOverflow { height: u64 },

    /// Stop flag raised during the nonce search.
    #[error("Mining stopped")]
    Stopped,

    /// Pause flag raised during the nonce search; the template is stale.
    #[error("Mining interrupted by peer block")]
    Interrupted,

    /// Every nonce tried without meeting the target.
    #[error("Mining failed: no valid nonce found")]
    NonceSpaceExhausted,
}
