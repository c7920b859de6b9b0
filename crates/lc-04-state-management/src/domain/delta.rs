use super::utxo::Utxo;
use shared_types::{Address, Hash, OutPoint};

/// What one transaction changed. Undone by removing `created`, restoring
/// `spent` and resetting the nonce, in that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxUndo {
    pub txid: Hash,
    /// Outputs consumed by the transaction.
    pub spent: Vec<(OutPoint, Utxo)>,
    /// Outputs created by the transaction.
    pub created: Vec<OutPoint>,
    /// `(sender, previous expected nonce)` if the nonce advanced.
    pub nonce: Option<(Address, u64)>,
}

impl TxUndo {
    pub fn new(txid: Hash) -> Self {
        Self {
            txid,
            ..Default::default()
        }
    }
}

/// Everything one applied block changed, one entry per transaction in
/// application order.
///
/// Reverting walks the entries backwards, so an output created and spent
/// inside the same block disappears again, and a partially built delta is
/// undone the same way as a complete one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockDelta {
    pub height: u64,
    pub block_hash: Hash,
    pub parent_hash: Hash,
    pub transactions: Vec<TxUndo>,
}

impl BlockDelta {
    pub fn new(height: u64, block_hash: Hash, parent_hash: Hash) -> Self {
        Self {
            height,
            block_hash,
            parent_hash,
            ..Default::default()
        }
    }
}
