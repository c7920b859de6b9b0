//! Transaction selector
//!
//! Greedy fee-rate selection under per-sender nonce ordering. Each sender
//! contributes at most one candidate at a time: the entry whose nonce is the
//! next one the block would consume. A sender's nonce N+1 only becomes a
//! candidate after nonce N was taken, however profitable N+1 is.

use lc_04_state_management::StateManager;
use lc_06_mempool::{MempoolEntry, TransactionPool};
use shared_types::{Address, Amount, Hash, Timestamp, Transaction, HEADER_SIZE};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Transactions picked for one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub transactions: Vec<Transaction>,
    pub total_fees: Amount,
    pub total_bytes: usize,
}

/// Heap head for one sender.
struct Head<'a> {
    entry: &'a MempoolEntry,
    queue: Vec<&'a MempoolEntry>,
    next: usize,
}

impl Head<'_> {
    fn key(&self) -> (u64, std::cmp::Reverse<Timestamp>, std::cmp::Reverse<Hash>) {
        (
            self.entry.fee_rate,
            std::cmp::Reverse(self.entry.admission_time),
            std::cmp::Reverse(self.entry.txid()),
        )
    }
}

impl PartialEq for Head<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Head<'_> {}

impl PartialOrd for Head<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

pub struct TransactionSelector {
    max_transactions: usize,
    /// Bytes left for user transactions once header and coinbase are counted.
    byte_budget: usize,
}

impl TransactionSelector {
    pub fn new(max_transactions: usize, max_block_size_bytes: usize) -> Self {
        let coinbase_size = Transaction::coinbase(0, [0; 20], 0, 0).serialized_size();
        Self {
            max_transactions,
            byte_budget: max_block_size_bytes.saturating_sub(HEADER_SIZE + coinbase_size),
        }
    }

    /// Pick transactions from `pool`, starting each sender at its confirmed
    /// next nonce so a gap is never bridged.
    pub fn select(&self, pool: &TransactionPool, state: &StateManager) -> Selection {
        let mut heap = BinaryHeap::new();
        for sender in pool.senders() {
            if let Some(head) = Self::head_for(pool, sender, state.expected_nonce(sender)) {
                heap.push(head);
            }
        }

        let mut selection = Selection::default();
        while let Some(head) = heap.pop() {
            if selection.transactions.len() >= self.max_transactions {
                break;
            }
            let entry = head.entry;
            if selection.total_bytes + entry.size > self.byte_budget {
                // Later nonces of this sender cannot go in without this one.
                continue;
            }

            selection.total_bytes += entry.size;
            selection.total_fees = selection.total_fees.saturating_add(entry.tx.fee);
            selection.transactions.push(entry.tx.clone());

            let next = head.queue.get(head.next).copied();
            if let Some(next) = next {
                if next.nonce() == entry.nonce() + 1 {
                    heap.push(Head {
                        entry: next,
                        next: head.next + 1,
                        queue: head.queue,
                    });
                }
            }
        }

        tracing::debug!(
            "[lc-17] selected {} transactions, {} bytes, {} fees",
            selection.transactions.len(),
            selection.total_bytes,
            selection.total_fees
        );
        selection
    }

    fn head_for<'a>(pool: &'a TransactionPool, sender: &Address, expected: u64) -> Option<Head<'a>> {
        let queue: Vec<&MempoolEntry> = pool
            .sender_entries(sender)
            .skip_while(|e| e.nonce() < expected)
            .collect();
        let first = *queue.first()?;
        if first.nonce() != expected {
            return None;
        }
        Some(Head {
            entry: first,
            queue,
            next: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_06_mempool::MempoolConfig;
    use shared_crypto::{sign_transaction, Ed25519KeyPair};
    use shared_types::{Block, OutPoint, TxOutput, COIN, ZERO_HASH};

    const BOB: Address = [0xB0; 20];

    struct Fixture {
        pool: TransactionPool,
        state: StateManager,
        genesis: Hash,
    }

    fn fixture(funded: &[Address]) -> Fixture {
        let mut coinbase = Transaction::coinbase(0, funded[0], COIN, 0);
        for owner in &funded[1..] {
            coinbase.outputs.push(TxOutput::new(COIN, *owner));
        }
        coinbase.seal();
        let genesis = coinbase.txid;
        let mut state = StateManager::default();
        state
            .apply_block(&Block::template(0, ZERO_HASH, 0, 0, [0; 32], vec![coinbase]))
            .unwrap();
        Fixture {
            pool: TransactionPool::new(MempoolConfig::for_testing()),
            state,
            genesis,
        }
    }

    fn transfer(from: &Ed25519KeyPair, input: OutPoint, fee: Amount, nonce: u64) -> Transaction {
        let mut tx = Transaction {
            sender: from.address(),
            recipient: BOB,
            amount: COIN / 2,
            fee,
            nonce,
            inputs: vec![input],
            outputs: vec![
                TxOutput::new(COIN / 2, BOB),
                TxOutput::new(COIN / 2 - fee, from.address()),
            ],
            signature: [0; 64],
            public_key: [0; 32],
            timestamp: 0,
            txid: ZERO_HASH,
        };
        sign_transaction(&mut tx, from);
        tx
    }

    impl Fixture {
        fn add(&mut self, from: &Ed25519KeyPair, vout: u32, fee: Amount, nonce: u64) -> Hash {
            let tx = transfer(from, OutPoint::new(self.genesis, vout), fee, nonce);
            self.pool.submit(tx, &mut self.state).unwrap()
        }
    }

    // =========================================================================
    // ORDERING TESTS
    // =========================================================================

    #[test]
    fn test_gap_is_never_bridged() {
        let alice = Ed25519KeyPair::from_seed([1; 32]);
        let mut f = fixture(&[alice.address(), alice.address()]);
        let first = f.add(&alice, 0, 10_000, 0);
        let gapped = f.add(&alice, 1, 90_000, 2);

        let selection = TransactionSelector::new(100, 1 << 20).select(&f.pool, &f.state);
        let txids: Vec<Hash> = selection.transactions.iter().map(|t| t.txid).collect();
        assert_eq!(txids, vec![first]);
        assert!(f.pool.contains(&gapped));
    }

    #[test]
    fn test_nonce_order_beats_fee_order() {
        let alice = Ed25519KeyPair::from_seed([1; 32]);
        let bob = Ed25519KeyPair::from_seed([2; 32]);
        let mut f = fixture(&[alice.address(), alice.address(), bob.address()]);
        let a0 = f.add(&alice, 0, 10_000, 0);
        let a1 = f.add(&alice, 1, 90_000, 1);
        let b0 = f.add(&bob, 2, 50_000, 0);

        let selection = TransactionSelector::new(100, 1 << 20).select(&f.pool, &f.state);
        let txids: Vec<Hash> = selection.transactions.iter().map(|t| t.txid).collect();
        assert_eq!(txids, vec![b0, a0, a1]);
        assert_eq!(selection.total_fees, 150_000);
    }

    #[test]
    fn test_count_limit() {
        let alice = Ed25519KeyPair::from_seed([1; 32]);
        let bob = Ed25519KeyPair::from_seed([2; 32]);
        let mut f = fixture(&[alice.address(), bob.address()]);
        f.add(&alice, 0, 10_000, 0);
        let best = f.add(&bob, 1, 20_000, 0);

        let selection = TransactionSelector::new(1, 1 << 20).select(&f.pool, &f.state);
        assert_eq!(selection.transactions.len(), 1);
        assert_eq!(selection.transactions[0].txid, best);
    }

    #[test]
    fn test_byte_limit() {
        let alice = Ed25519KeyPair::from_seed([1; 32]);
        let bob = Ed25519KeyPair::from_seed([2; 32]);
        let mut f = fixture(&[alice.address(), bob.address()]);
        let alice_tx = f.add(&alice, 0, 10_000, 0);
        let tx_size = f.pool.get(&alice_tx).unwrap().size;
        f.add(&bob, 1, 20_000, 0);

        let coinbase_size = Transaction::coinbase(0, [0; 20], 0, 0).serialized_size();
        let max = HEADER_SIZE + coinbase_size + tx_size;
        let selection = TransactionSelector::new(100, max).select(&f.pool, &f.state);
        assert_eq!(selection.transactions.len(), 1);
        assert_eq!(selection.total_bytes, tx_size);
    }

    #[test]
    fn test_empty_pool() {
        let alice = Ed25519KeyPair::from_seed([1; 32]);
        let f = fixture(&[alice.address()]);
        let selection = TransactionSelector::new(100, 1 << 20).select(&f.pool, &f.state);
        assert_eq!(selection, Selection::default());
    }
}
