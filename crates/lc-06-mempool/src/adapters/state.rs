//! `StateProvider` backed by the confirmed `StateManager`.

use crate::ports::StateProvider;
use lc_04_state_management::{StateManager, StateResult, UtxoError};
use shared_types::{Address, Amount, Hash, OutPoint, Transaction};

impl StateProvider for StateManager {
    fn expected_nonce(&self, address: &Address) -> u64 {
        StateManager::expected_nonce(self, address)
    }

    fn check_inputs(&self, tx: &Transaction) -> StateResult<Amount> {
        StateManager::check_inputs(self, tx, true)
    }

    fn reserve_inputs(&mut self, txid: Hash, inputs: &[OutPoint]) -> Result<(), UtxoError> {
        StateManager::reserve_inputs(self, txid, inputs)
    }

    fn release_inputs(&mut self, txid: &Hash, inputs: &[OutPoint]) {
        StateManager::release_inputs(self, txid, inputs)
    }

    fn clear_reservations(&mut self) {
        StateManager::clear_reservations(self)
    }
}
