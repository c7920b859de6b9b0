pub mod delta;
pub mod errors;
pub mod nonce;
pub mod utxo;

pub use delta::{BlockDelta, TxUndo};
pub use errors::{NonceError, StateError, StateResult, UtxoError};
pub use nonce::{NonceEntry, NonceSnapshot, NonceTracker};
pub use utxo::{CompactionReport, Utxo, UtxoEntry, UtxoSet, UtxoSnapshot};
