//! Broadcaster that only logs. Stands in for a gossip layer.

use lc_08_consensus::Broadcaster;
use shared_types::{short_hex, Block, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct LoggingBroadcaster {
    blocks: AtomicU64,
    transactions: AtomicU64,
}

impl LoggingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks_sent(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn transactions_sent(&self) -> u64 {
        self.transactions.load(Ordering::Relaxed)
    }
}

impl Broadcaster for LoggingBroadcaster {
    fn broadcast_block(&self, block: &Block) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
        ledger_telemetry::block_event!(
            info,
            "broadcast",
            block.index(),
            short_hex(&block.hash()),
            "announcing block",
            transactions = block.transactions.len()
        );
    }

    fn broadcast_transaction(&self, tx: &Transaction) {
        self.transactions.fetch_add(1, Ordering::Relaxed);
        ledger_telemetry::tx_event!(
            debug,
            "broadcast",
            short_hex(&tx.txid),
            "announcing transaction",
            fee = tx.fee
        );
    }
}
