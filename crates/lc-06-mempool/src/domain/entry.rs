//! Pool entries and their priority ordering.

use shared_types::{Address, Amount, Hash, Timestamp, Transaction};
use std::cmp::Ordering;

/// Fee-rate in base units per 1000 serialized bytes.
pub fn fee_rate(fee: Amount, size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    let rate = u128::from(fee) * 1000 / size as u128;
    u64::try_from(rate).unwrap_or(u64::MAX)
}

/// A pending transaction plus admission bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MempoolEntry {
    pub tx: Transaction,
    pub admission_time: Timestamp,
    pub fee_rate: u64,
    pub size: usize,
}

impl MempoolEntry {
    pub fn new(tx: Transaction, admission_time: Timestamp) -> Self {
        let size = tx.serialized_size();
        Self {
            fee_rate: fee_rate(tx.fee, size),
            size,
            admission_time,
            tx,
        }
    }

    pub fn txid(&self) -> Hash {
        self.tx.txid
    }

    pub fn sender(&self) -> Address {
        self.tx.sender
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn priced(&self) -> PricedEntry {
        PricedEntry {
            fee_rate: self.fee_rate,
            admission_time: self.admission_time,
            txid: self.tx.txid,
        }
    }
}

/// Key of the priority index.
///
/// Sorts best first: higher fee-rate, then earlier admission, then txid.
/// The last element of the index is the eviction candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricedEntry {
    pub fee_rate: u64,
    pub admission_time: Timestamp,
    pub txid: Hash,
}

impl Ord for PricedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fee_rate
            .cmp(&self.fee_rate)
            .then_with(|| self.admission_time.cmp(&other.admission_time))
            .then_with(|| self.txid.cmp(&other.txid))
    }
}

impl PartialOrd for PricedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
