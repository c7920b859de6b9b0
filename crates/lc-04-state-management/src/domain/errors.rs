use shared_types::{Address, Amount, Hash, OutPoint, TransactionError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UtxoError {
    #[error("Unknown output {0}")]
    UnknownOutput(OutPoint),

    #[error("Output {0} already spent")]
    AlreadySpent(OutPoint),

    #[error("Output {outpoint} reserved by pending tx {}", hex_short(.by))]
    Reserved { outpoint: OutPoint, by: Hash },

    #[error("Output {0} already exists")]
    DuplicateOutput(OutPoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    #[error("Nonce gap: expected {expected}, got {actual}")]
    Gap { expected: u64, actual: u64 },

    #[error("Nonce replay: expected {expected}, got {actual}")]
    Replay { expected: u64, actual: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error(transparent)]
    Utxo(#[from] UtxoError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error("Malformed transaction: {0}")]
    Malformed(#[from] TransactionError),

    #[error("Input {outpoint} owned by {}, not sender", hex_short(.owner))]
    NotOwner { outpoint: OutPoint, owner: Address },

    #[error("Insufficient funds: inputs {inputs}, required {required}")]
    InsufficientFunds { inputs: Amount, required: Amount },

    #[error("Value overflow")]
    ValueOverflow,

    #[error("Coinbase out of position at index {0}")]
    MisplacedCoinbase(usize),

    #[error("Block height {actual} does not extend state at {expected}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("No applied block to roll back")]
    NothingToRollBack,
}

pub type StateResult<T> = Result<T, StateError>;

fn hex_short(bytes: &[u8]) -> String {
    shared_types::short_hex(bytes)
}
