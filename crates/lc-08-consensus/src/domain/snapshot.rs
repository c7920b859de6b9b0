//! State summaries used for checkpoints and cross-node comparison.

use lc_04_state_management::StateManager;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Block, Hash, Transaction};

/// Digest-level view of the confirmed state. Two nodes agree on the ledger
/// exactly when their snapshots are equal.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub tip_hash: Hash,
    #[serde_as(as = "Hex")]
    pub utxo_digest: Hash,
    #[serde_as(as = "Hex")]
    pub nonce_digest: Hash,
    pub utxo_count: usize,
}

impl ChainSnapshot {
    pub fn capture(state: &StateManager) -> Self {
        Self {
            height: state.height().unwrap_or(0),
            tip_hash: state.tip_hash(),
            utxo_digest: state.utxo_digest(),
            nonce_digest: state.nonce_digest(),
            utxo_count: state.utxos().len(),
        }
    }

    /// True if `state`, having just applied `block`, is what this snapshot recorded.
    pub fn matches(&self, state: &StateManager, block: &Block) -> bool {
        self.height == block.index()
            && self.tip_hash == block.hash()
            && self.utxo_digest == state.utxo_digest()
            && self.nonce_digest == state.nonce_digest()
    }
}

/// Outcome of a successful `replace_chain`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgSummary {
    pub common_ancestor: u64,
    pub old_height: u64,
    #[serde_as(as = "Hex")]
    pub old_tip: Hash,
    pub new_height: u64,
    #[serde_as(as = "Hex")]
    pub new_tip: Hash,
    pub rolled_back: usize,
    pub applied: usize,
    /// Orphaned transactions accepted back into the mempool.
    pub readmitted: usize,
}

/// A confirmed transaction with its position in the chain.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub block_hash: Hash,
    pub transaction: Transaction,
}
