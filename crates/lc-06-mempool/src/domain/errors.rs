//! Admission rejections.

use lc_04_state_management::{NonceError, StateError, UtxoError};
use shared_types::{short_hex, Amount, Hash, OutPoint, Timestamp};
use thiserror::Error;

/// Why a submission was not admitted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Reject {
    /// Structure, signature or ownership check failed.
    #[error("invalid transaction: {0}")]
    Invalid(String),

    /// Sender is serving a temporary ban.
    #[error("sender banned until {until}")]
    Banned { until: Timestamp },

    #[error("fee rate {fee_rate} below floor {minimum}")]
    LowFee { fee_rate: u64, minimum: u64 },

    /// Nonce too far beyond the confirmed next nonce.
    #[error("nonce {actual} too far ahead of expected {expected} (max gap {max_gap})")]
    NonceGap {
        expected: u64,
        actual: u64,
        max_gap: u64,
    },

    /// Nonce already confirmed, or already taken by a pending transaction.
    #[error("nonce {actual} already used (expected {expected})")]
    NonceReplay { expected: u64, actual: u64 },

    /// Input unknown, spent, or reserved by another pending transaction.
    #[error("input {0} is not spendable")]
    DoubleSpend(OutPoint),

    #[error("inputs {inputs} do not cover outputs plus fee {required}")]
    InsufficientFunds { inputs: Amount, required: Amount },

    #[error("duplicate transaction {}", short_hex(.0))]
    Duplicate(Hash),

    /// At capacity and nothing cheaper to evict.
    #[error("mempool full")]
    PoolFull,

    #[error("sender reached limit of {limit} pending transactions")]
    SenderLimit { limit: usize },
}

impl Reject {
    /// Label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::Banned { .. } => "banned",
            Self::LowFee { .. } => "low_fee",
            Self::NonceGap { .. } => "nonce_gap",
            Self::NonceReplay { .. } => "nonce_replay",
            Self::DoubleSpend(_) => "double_spend",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Duplicate(_) => "duplicate",
            Self::PoolFull => "pool_full",
            Self::SenderLimit { .. } => "sender_limit",
        }
    }

    /// Whether this rejection counts toward the sender's ban window.
    ///
    /// Only failures the sender is responsible for count. Fee floors, capacity
    /// and duplicates do not.
    pub fn counts_as_invalid(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_)
                | Self::NonceGap { .. }
                | Self::NonceReplay { .. }
                | Self::DoubleSpend(_)
                | Self::InsufficientFunds { .. }
        )
    }
}

impl From<StateError> for Reject {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Utxo(
                UtxoError::UnknownOutput(outpoint)
                | UtxoError::AlreadySpent(outpoint)
                | UtxoError::Reserved { outpoint, .. },
            ) => Self::DoubleSpend(outpoint),
            StateError::InsufficientFunds { inputs, required } => {
                Self::InsufficientFunds { inputs, required }
            }
            StateError::Nonce(NonceError::Replay { expected, actual }) => {
                Self::NonceReplay { expected, actual }
            }
            StateError::Nonce(NonceError::Gap { expected, actual }) => Self::NonceGap {
                expected,
                actual,
                max_gap: 0,
            },
            other => Self::Invalid(other.to_string()),
        }
    }
}
