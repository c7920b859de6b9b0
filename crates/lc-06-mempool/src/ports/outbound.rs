//! Outbound (Driven) ports for the Mempool subsystem.

use lc_04_state_management::{StateResult, UtxoError};
use shared_types::{Address, Amount, Hash, OutPoint, Transaction};

/// Confirmed state the pool validates against.
///
/// The pool never mutates confirmed outputs. It only places and drops
/// reservations so two pending transactions cannot claim the same input.
pub trait StateProvider {
    /// Confirmed next nonce for `address`.
    fn expected_nonce(&self, address: &Address) -> u64;

    /// Input existence, ownership, reservation and value checks.
    /// Returns the input total.
    fn check_inputs(&self, tx: &Transaction) -> StateResult<Amount>;

    /// Reserve `inputs` for pending transaction `txid`. All or nothing.
    fn reserve_inputs(&mut self, txid: Hash, inputs: &[OutPoint]) -> Result<(), UtxoError>;

    /// Drop the reservations `txid` holds on `inputs`.
    fn release_inputs(&mut self, txid: &Hash, inputs: &[OutPoint]);

    /// Drop every reservation before the pool rebuilds them.
    fn clear_reservations(&mut self);
}
