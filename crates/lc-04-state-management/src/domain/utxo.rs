//! # UTXO Set
//!
//! Unspent outputs keyed by `(txid, vout)`, plus the pending reservations the
//! mempool places on outputs its transactions intend to spend.
//!
//! Reservations never affect confirmed state: `snapshot_digest` covers only
//! unspent entries, and `restore` drops every reservation.

use super::errors::UtxoError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Address, Amount, Hash, OutPoint, Transaction, TxOutput};
use std::collections::HashMap;

/// An unspent output.
pub type Utxo = TxOutput;

const DIGEST_DOMAIN: &[u8] = b"LCUTXO\x01";

/// One `(outpoint, output)` pair in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub outpoint: OutPoint,
    pub output: Utxo,
}

/// Full copy of the unspent set, sorted by outpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSnapshot {
    pub entries: Vec<UtxoEntry>,
}

/// Result of `compact_utxo_set`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactionReport {
    pub unspent: usize,
    pub dropped_reservations: usize,
}

#[derive(Clone, Debug, Default)]
pub struct UtxoSet {
    unspent: HashMap<OutPoint, Utxo>,
    /// outpoint -> txid of the pending transaction that intends to spend it
    reserved: HashMap<OutPoint, Hash>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.unspent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unspent.is_empty()
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        self.unspent.get(outpoint)
    }

    /// Look up an unspent output. With `exclude_pending`, outputs reserved by a
    /// pending transaction are reported as unavailable.
    pub fn get_unspent_output(&self, txid: &Hash, vout: u32, exclude_pending: bool) -> Option<Utxo> {
        let outpoint = OutPoint::new(*txid, vout);
        if exclude_pending && self.reserved.contains_key(&outpoint) {
            return None;
        }
        self.unspent.get(&outpoint).copied()
    }

    pub fn reserved_by(&self, outpoint: &OutPoint) -> Option<Hash> {
        self.reserved.get(outpoint).copied()
    }

    pub fn reservation_count(&self) -> usize {
        self.reserved.len()
    }

    /// Sum of unspent outputs owned by `address`.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.unspent
            .values()
            .filter(|u| &u.owner == address)
            .fold(0u64, |acc, u| acc.saturating_add(u.amount))
    }

    /// Unspent outputs owned by `address`, sorted by outpoint.
    pub fn outputs_of(&self, address: &Address) -> Vec<(OutPoint, Utxo)> {
        let mut owned: Vec<_> = self
            .unspent
            .iter()
            .filter(|(_, u)| &u.owner == address)
            .map(|(o, u)| (*o, *u))
            .collect();
        owned.sort_by_key(|(o, _)| *o);
        owned
    }

    // =========================================================================
    // CONFIRMED MUTATIONS
    // =========================================================================

    /// Consume every input of `tx`. Either all inputs are spent or none.
    ///
    /// Returns the spent entries in input order so they can be restored.
    pub fn process_transaction_inputs(
        &mut self,
        tx: &Transaction,
    ) -> Result<Vec<(OutPoint, Utxo)>, UtxoError> {
        if let Some(missing) = tx.inputs.iter().find(|i| !self.unspent.contains_key(i)) {
            return Err(UtxoError::UnknownOutput(*missing));
        }
        let mut spent = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            match self.unspent.remove(input) {
                Some(utxo) => {
                    self.reserved.remove(input);
                    spent.push((*input, utxo));
                }
                // Repeated input within the same transaction.
                None => {
                    self.restore_spent(&spent);
                    return Err(UtxoError::AlreadySpent(*input));
                }
            }
        }
        Ok(spent)
    }

    /// Create every output of `tx`. Either all are created or none.
    pub fn process_transaction_outputs(
        &mut self,
        tx: &Transaction,
    ) -> Result<Vec<OutPoint>, UtxoError> {
        let created: Vec<(OutPoint, Utxo)> = tx.created_outpoints().map(|(o, u)| (o, *u)).collect();
        if let Some((dup, _)) = created.iter().find(|(o, _)| self.unspent.contains_key(o)) {
            return Err(UtxoError::DuplicateOutput(*dup));
        }
        let mut outpoints = Vec::with_capacity(created.len());
        for (outpoint, utxo) in created {
            self.unspent.insert(outpoint, utxo);
            outpoints.push(outpoint);
        }
        Ok(outpoints)
    }

    /// Undo `process_transaction_inputs`.
    pub fn restore_spent(&mut self, spent: &[(OutPoint, Utxo)]) {
        for (outpoint, utxo) in spent {
            self.unspent.insert(*outpoint, *utxo);
        }
    }

    /// Undo `process_transaction_outputs`.
    pub fn remove_created(&mut self, created: &[OutPoint]) {
        for outpoint in created {
            self.unspent.remove(outpoint);
            self.reserved.remove(outpoint);
        }
    }

    /// Insert an output directly (genesis allocations).
    pub fn insert(&mut self, outpoint: OutPoint, utxo: Utxo) -> Result<(), UtxoError> {
        if self.unspent.contains_key(&outpoint) {
            return Err(UtxoError::DuplicateOutput(outpoint));
        }
        self.unspent.insert(outpoint, utxo);
        Ok(())
    }

    // =========================================================================
    // PENDING RESERVATIONS
    // =========================================================================

    /// Reserve `inputs` for pending transaction `txid`. All or nothing.
    pub fn reserve_inputs(&mut self, txid: Hash, inputs: &[OutPoint]) -> Result<(), UtxoError> {
        for input in inputs {
            if !self.unspent.contains_key(input) {
                return Err(UtxoError::UnknownOutput(*input));
            }
            if let Some(by) = self.reserved.get(input) {
                if *by != txid {
                    return Err(UtxoError::Reserved {
                        outpoint: *input,
                        by: *by,
                    });
                }
            }
        }
        for input in inputs {
            self.reserved.insert(*input, txid);
        }
        Ok(())
    }

    /// Drop the reservations `txid` holds on `inputs`. Holds of other
    /// transactions are left alone.
    pub fn release_inputs(&mut self, txid: &Hash, inputs: &[OutPoint]) {
        for input in inputs {
            if self.reserved.get(input) == Some(txid) {
                self.reserved.remove(input);
            }
        }
    }

    pub fn clear_reservations(&mut self) {
        self.reserved.clear();
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    pub fn snapshot(&self) -> UtxoSnapshot {
        let mut entries: Vec<UtxoEntry> = self
            .unspent
            .iter()
            .map(|(outpoint, output)| UtxoEntry {
                outpoint: *outpoint,
                output: *output,
            })
            .collect();
        entries.sort_by_key(|e| e.outpoint);
        UtxoSnapshot { entries }
    }

    /// Replace the whole set. Reservations are dropped.
    pub fn restore(&mut self, snapshot: &UtxoSnapshot) {
        self.unspent = snapshot
            .entries
            .iter()
            .map(|e| (e.outpoint, e.output))
            .collect();
        self.reserved.clear();
    }

    /// Canonical SHA-256 over the sorted unspent entries.
    pub fn snapshot_digest(&self) -> Hash {
        let mut keys: Vec<&OutPoint> = self.unspent.keys().collect();
        keys.sort();

        let mut hasher = Sha256::new();
        hasher.update(DIGEST_DOMAIN);
        hasher.update((keys.len() as u64).to_le_bytes());
        for outpoint in keys {
            let utxo = &self.unspent[outpoint];
            hasher.update(outpoint.txid);
            hasher.update(outpoint.vout.to_le_bytes());
            hasher.update(utxo.amount.to_le_bytes());
            hasher.update(utxo.owner);
        }
        hasher.finalize().into()
    }

    /// Reclaim memory and drop reservations on outputs that no longer exist.
    pub fn compact_utxo_set(&mut self) -> CompactionReport {
        let before = self.reserved.len();
        let unspent = &self.unspent;
        self.reserved.retain(|o, _| unspent.contains_key(o));
        self.unspent.shrink_to_fit();
        self.reserved.shrink_to_fit();
        CompactionReport {
            unspent: self.unspent.len(),
            dropped_reservations: before - self.reserved.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{COIN, ZERO_HASH};

    const ALICE: Address = [0xA1; 20];
    const BOB: Address = [0xB0; 20];

    fn funded() -> (UtxoSet, OutPoint) {
        let mut set = UtxoSet::new();
        let op = OutPoint::new([1; 32], 0);
        set.insert(op, TxOutput::new(2 * COIN, ALICE)).unwrap();
        (set, op)
    }

    fn spend(input: OutPoint) -> Transaction {
        let mut tx = Transaction {
            sender: ALICE,
            recipient: BOB,
            amount: COIN,
            fee: COIN / 100,
            nonce: 0,
            inputs: vec![input],
            outputs: vec![
                TxOutput::new(COIN, BOB),
                TxOutput::new(99 * COIN / 100, ALICE),
            ],
            signature: [0; 64],
            public_key: [0; 32],
            timestamp: 0,
            txid: ZERO_HASH,
        };
        tx.seal();
        tx
    }

    // =========================================================================
    // SPEND / CREATE
    // =========================================================================

    #[test]
    fn test_spend_and_create() {
        let (mut set, op) = funded();
        let tx = spend(op);

        let spent = set.process_transaction_inputs(&tx).unwrap();
        assert_eq!(spent, vec![(op, TxOutput::new(2 * COIN, ALICE))]);
        set.process_transaction_outputs(&tx).unwrap();

        assert!(set.get(&op).is_none());
        assert_eq!(set.balance_of(&BOB), COIN);
        assert_eq!(set.balance_of(&ALICE), 99 * COIN / 100);
    }

    #[test]
    fn test_unknown_input_leaves_set_untouched() {
        let (mut set, op) = funded();
        let mut tx = spend(op);
        tx.inputs.push(OutPoint::new([9; 32], 3));
        tx.seal();

        assert_eq!(
            set.process_transaction_inputs(&tx),
            Err(UtxoError::UnknownOutput(OutPoint::new([9; 32], 3)))
        );
        assert!(set.get(&op).is_some());
    }

    #[test]
    fn test_repeated_input_rolls_back() {
        let (mut set, op) = funded();
        let mut tx = spend(op);
        tx.inputs.push(op);

        assert_eq!(
            set.process_transaction_inputs(&tx),
            Err(UtxoError::AlreadySpent(op))
        );
        assert!(set.get(&op).is_some());
    }

    #[test]
    fn test_outputs_are_never_created_twice() {
        let (mut set, op) = funded();
        let tx = spend(op);
        set.process_transaction_outputs(&tx).unwrap();
        assert!(matches!(
            set.process_transaction_outputs(&tx),
            Err(UtxoError::DuplicateOutput(_))
        ));
        assert_eq!(set.len(), 3);
    }

    // =========================================================================
    // RESERVATIONS
    // =========================================================================

    #[test]
    fn test_reservation_hides_output_when_excluding_pending() {
        let (mut set, op) = funded();
        set.reserve_inputs([7; 32], &[op]).unwrap();

        assert!(set.get_unspent_output(&op.txid, op.vout, true).is_none());
        assert!(set.get_unspent_output(&op.txid, op.vout, false).is_some());
        assert_eq!(
            set.reserve_inputs([8; 32], &[op]),
            Err(UtxoError::Reserved {
                outpoint: op,
                by: [7; 32]
            })
        );
        // Same owner may re-reserve.
        assert!(set.reserve_inputs([7; 32], &[op]).is_ok());

        set.release_inputs(&[8; 32], &[op]);
        assert!(set.get_unspent_output(&op.txid, op.vout, true).is_none());
        set.release_inputs(&[7; 32], &[op]);
        assert!(set.get_unspent_output(&op.txid, op.vout, true).is_some());
    }

    #[test]
    fn test_compaction_drops_dangling_reservations() {
        let (mut set, op) = funded();
        set.reserve_inputs([7; 32], &[op]).unwrap();
        set.unspent.remove(&op);
        let report = set.compact_utxo_set();
        assert_eq!(report.dropped_reservations, 1);
        assert_eq!(set.reservation_count(), 0);
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    #[test]
    fn test_digest_is_order_independent() {
        let a = OutPoint::new([1; 32], 0);
        let b = OutPoint::new([2; 32], 1);

        let mut left = UtxoSet::new();
        left.insert(a, TxOutput::new(1, ALICE)).unwrap();
        left.insert(b, TxOutput::new(2, BOB)).unwrap();

        let mut right = UtxoSet::new();
        right.insert(b, TxOutput::new(2, BOB)).unwrap();
        right.insert(a, TxOutput::new(1, ALICE)).unwrap();

        assert_eq!(left.snapshot_digest(), right.snapshot_digest());
        right.restore(&UtxoSnapshot::default());
        assert_ne!(left.snapshot_digest(), right.snapshot_digest());
    }

    #[test]
    fn test_snapshot_restore_roundtrip_through_json() {
        let (mut set, op) = funded();
        set.reserve_inputs([7; 32], &[op]).unwrap();
        let digest = set.snapshot_digest();
        let json = serde_json::to_string(&set.snapshot()).unwrap();

        let mut other = UtxoSet::new();
        other.restore(&serde_json::from_str(&json).unwrap());
        assert_eq!(other.snapshot_digest(), digest);
        assert_eq!(other.reservation_count(), 0);
    }
}
