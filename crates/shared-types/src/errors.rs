//! # Error Types
//!
//! Defines error types used across subsystems.

use crate::entities::{Amount, OutPoint};
use thiserror::Error;

/// Context-free transaction shape violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("txid does not match canonical fields")]
    TxidMismatch,

    #[error("transaction has no inputs")]
    MissingInputs,

    #[error("transaction has no outputs")]
    MissingOutputs,

    #[error("output {index} has zero value")]
    ZeroValueOutput { index: usize },

    #[error("input {0} listed twice")]
    DuplicateInput(OutPoint),

    #[error("output total overflows")]
    ValueOverflow,

    #[error("declared amount {declared} but recipient is paid {paid}")]
    AmountMismatch { declared: Amount, paid: Amount },
}

/// Errors raised by the persistence substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Blob not found in storage.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob exists but cannot be decoded or fails an integrity check.
    #[error("Corrupted blob {key}: {reason}")]
    Corrupted { key: String, reason: String },

    /// Envelope version is not understood by this build.
    #[error("Unsupported version {found} for {key} (supported {supported})")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    /// Underlying filesystem failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Encoding failure on write.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Another process holds the data directory.
    #[error("Data directory locked: {0}")]
    Locked(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}
