//! Error types for the finality subsystem.

use shared_types::{short_hex, Address, Hash, StorageError};
use thiserror::Error;

/// Finality subsystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalityError {
    /// Vote signature does not verify against the registered key.
    #[error("Invalid vote signature from validator {}", short_hex(.validator))]
    InvalidSignature { validator: Address },

    /// Voter is not in the registry (never registered, or tombstoned).
    #[error("Unknown validator: {}", short_hex(.validator))]
    UnknownValidator { validator: Address },

    /// Validator signed two different hashes at one height. The vote is dropped.
    #[error("Double sign by {} at height {height}", short_hex(.validator))]
    DoubleSign { validator: Address, height: u64 },

    /// Vote targets a height already finalized with another hash.
    #[error("Height {height} already finalized as {}", short_hex(.finalized))]
    ConflictsWithFinalized { height: u64, finalized: Hash },

    /// Validator was permanently removed.
    #[error("Validator {} is tombstoned", short_hex(.validator))]
    Tombstoned { validator: Address },

    /// Too few eligible validators for the configured set size.
    #[error("Insufficient validators: {eligible} eligible, {required} required")]
    InsufficientValidators { eligible: usize, required: usize },

    /// Rejected configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persistence failure or inconsistent persisted state.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for finality operations.
pub type FinalityResult<T> = Result<T, FinalityError>;
