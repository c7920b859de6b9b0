//! # State Manager
//!
//! Owns the UTXO set and nonce tracker and applies whole blocks to them.
//!
//! Every applied block leaves a `BlockDelta` on an append-only log. Rolling
//! back pops the newest delta and reverts it, which is how reorgs unwind to
//! the common ancestor without copying the whole set.

use crate::domain::{
    BlockDelta, CompactionReport, NonceSnapshot, NonceTracker, StateError, StateResult, TxUndo,
    Utxo, UtxoError, UtxoSet, UtxoSnapshot,
};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Address, Amount, Block, Hash, OutPoint, Transaction, ZERO_HASH};
use std::collections::VecDeque;

/// Default number of block deltas kept for rollback.
pub const DEFAULT_DELTA_RETENTION: usize = 1_000;

/// Full state copy used by checkpoints and recovery.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub height: Option<u64>,
    #[serde_as(as = "Hex")]
    pub tip_hash: Hash,
    pub utxos: UtxoSnapshot,
    pub nonces: NonceSnapshot,
}

#[derive(Clone, Debug)]
pub struct StateManager {
    utxos: UtxoSet,
    nonces: NonceTracker,
    deltas: VecDeque<BlockDelta>,
    retention: usize,
    height: Option<u64>,
    tip_hash: Hash,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(DEFAULT_DELTA_RETENTION)
    }
}

impl StateManager {
    pub fn new(retention: usize) -> Self {
        Self {
            utxos: UtxoSet::new(),
            nonces: NonceTracker::new(),
            deltas: VecDeque::new(),
            retention: retention.max(1),
            height: None,
            tip_hash: ZERO_HASH,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn nonces(&self) -> &NonceTracker {
        &self.nonces
    }

    /// Index of the last applied block, `None` before genesis.
    pub fn height(&self) -> Option<u64> {
        self.height
    }

    pub fn tip_hash(&self) -> Hash {
        self.tip_hash
    }

    /// Number of blocks that can currently be rolled back.
    pub fn rollback_depth(&self) -> usize {
        self.deltas.len()
    }

    pub fn expected_nonce(&self, address: &Address) -> u64 {
        self.nonces.expected_nonce(address)
    }

    pub fn get_unspent_output(&self, txid: &Hash, vout: u32, exclude_pending: bool) -> Option<Utxo> {
        self.utxos.get_unspent_output(txid, vout, exclude_pending)
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.utxos.balance_of(address)
    }

    pub fn utxo_digest(&self) -> Hash {
        self.utxos.snapshot_digest()
    }

    pub fn nonce_digest(&self) -> Hash {
        self.nonces.digest()
    }

    /// Value checks for a non-coinbase transaction against confirmed state.
    ///
    /// Each input must exist and belong to the sender, and the inputs must cover
    /// outputs plus fee. With `exclude_pending`, inputs reserved by a different
    /// pending transaction count as unavailable. Returns the input total.
    pub fn check_inputs(&self, tx: &Transaction, exclude_pending: bool) -> StateResult<Amount> {
        let mut total: Amount = 0;
        for input in &tx.inputs {
            let utxo = self
                .utxos
                .get(input)
                .ok_or(UtxoError::UnknownOutput(*input))?;
            if exclude_pending {
                if let Some(by) = self.utxos.reserved_by(input) {
                    if by != tx.txid {
                        return Err(UtxoError::Reserved {
                            outpoint: *input,
                            by,
                        }
                        .into());
                    }
                }
            }
            if utxo.owner != tx.sender {
                return Err(StateError::NotOwner {
                    outpoint: *input,
                    owner: utxo.owner,
                });
            }
            total = total
                .checked_add(utxo.amount)
                .ok_or(StateError::ValueOverflow)?;
        }
        let required = tx
            .output_total()
            .and_then(|o| o.checked_add(tx.fee))
            .ok_or(StateError::ValueOverflow)?;
        if total < required {
            return Err(StateError::InsufficientFunds {
                inputs: total,
                required,
            });
        }
        Ok(total)
    }

    // =========================================================================
    // PENDING RESERVATIONS
    // =========================================================================

    pub fn reserve_inputs(&mut self, txid: Hash, inputs: &[OutPoint]) -> Result<(), UtxoError> {
        self.utxos.reserve_inputs(txid, inputs)
    }

    pub fn release_inputs(&mut self, txid: &Hash, inputs: &[OutPoint]) {
        self.utxos.release_inputs(txid, inputs)
    }

    pub fn clear_reservations(&mut self) {
        self.utxos.clear_reservations()
    }

    // =========================================================================
    // BLOCK APPLICATION
    // =========================================================================

    /// Apply `block` on top of the current state. All or nothing.
    ///
    /// On any failure the partial delta is reverted and the state is exactly
    /// as before the call.
    pub fn apply_block(&mut self, block: &Block) -> StateResult<()> {
        let expected = self.height.map_or(0, |h| h + 1);
        if block.index() != expected {
            return Err(StateError::HeightMismatch {
                expected,
                actual: block.index(),
            });
        }

        let mut delta = BlockDelta::new(block.index(), block.hash(), self.tip_hash);
        for (position, tx) in block.transactions.iter().enumerate() {
            let mut undo = TxUndo::new(tx.txid);
            let result = self.apply_transaction(position, tx, &mut undo);
            delta.transactions.push(undo);
            if let Err(e) = result {
                self.revert(&delta);
                tracing::debug!(
                    "[lc-04] block {} rejected at tx {}: {}",
                    block.index(),
                    position,
                    e
                );
                return Err(e);
            }
        }

        self.height = Some(block.index());
        self.tip_hash = block.hash();
        self.deltas.push_back(delta);
        while self.deltas.len() > self.retention {
            self.deltas.pop_front();
        }
        Ok(())
    }

    /// Apply one transaction, recording each completed step in `undo`.
    fn apply_transaction(
        &mut self,
        position: usize,
        tx: &Transaction,
        undo: &mut TxUndo,
    ) -> StateResult<()> {
        tx.check_structure()?;
        if tx.is_coinbase() {
            if position != 0 {
                return Err(StateError::MisplacedCoinbase(position));
            }
        } else {
            self.check_inputs(tx, false)?;
            let previous = self.nonces.advance(&tx.sender, tx.nonce)?;
            undo.nonce = Some((tx.sender, previous));
            undo.spent = self.utxos.process_transaction_inputs(tx)?;
        }
        undo.created = self.utxos.process_transaction_outputs(tx)?;
        Ok(())
    }

    /// Undo `delta` transaction by transaction, newest first.
    fn revert(&mut self, delta: &BlockDelta) {
        for undo in delta.transactions.iter().rev() {
            self.utxos.remove_created(&undo.created);
            self.utxos.restore_spent(&undo.spent);
            if let Some((address, previous)) = &undo.nonce {
                self.nonces.revert(address, *previous);
            }
        }
    }

    /// Pop and revert the newest applied block.
    pub fn rollback_block(&mut self) -> StateResult<BlockDelta> {
        let delta = self.deltas.pop_back().ok_or(StateError::NothingToRollBack)?;
        self.revert(&delta);
        self.height = delta.height.checked_sub(1);
        self.tip_hash = delta.parent_hash;
        tracing::debug!("[lc-04] rolled back block {}", delta.height);
        Ok(delta)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            height: self.height,
            tip_hash: self.tip_hash,
            utxos: self.utxos.snapshot(),
            nonces: self.nonces.snapshot(),
        }
    }

    /// Replace all state. The delta log and reservations are cleared.
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        self.utxos.restore(&snapshot.utxos);
        self.nonces.restore(&snapshot.nonces);
        self.height = snapshot.height;
        self.tip_hash = snapshot.tip_hash;
        self.deltas.clear();
    }

    /// Drop everything, back to the pre-genesis state.
    pub fn reset(&mut self) {
        self.restore(&StateSnapshot::default());
    }

    /// Periodic memory reclamation.
    pub fn compact(&mut self) -> CompactionReport {
        let report = self.utxos.compact_utxo_set();
        self.deltas.shrink_to_fit();
        tracing::debug!(
            "[lc-04] compacted: {} unspent, {} dangling reservations dropped",
            report.unspent,
            report.dropped_reservations
        );
        report
    }
}
