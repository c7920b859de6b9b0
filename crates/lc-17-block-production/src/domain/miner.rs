//! # Miner
//!
//! Template assembly and the batched nonce search.
//!
//! The search never touches ledger state. Callers build a template under
//! their ledger lock, release it, mine, then re-lock and check the tip
//! before committing.

use super::pow::{meets_target, target};
use super::reward::build_coinbase;
use super::selector::{Selection, TransactionSelector};
use crate::config::BlockProductionConfig;
use crate::error::{BlockProductionError, Result};
use lc_04_state_management::StateManager;
use lc_06_mempool::TransactionPool;
use shared_crypto::Ed25519KeyPair;
use shared_types::{Address, Block, BlockHeader, Hash, TimeSource, Timestamp};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cooperative stop and pause flags shared with the mining task.
#[derive(Debug, Default)]
pub struct MiningControl {
    stopped: AtomicBool,
    paused_until: AtomicU64,
}

impl MiningControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Pause until `now + backoff_ms`. Never shortens an existing pause.
    pub fn pause_for(&self, now: Timestamp, backoff_ms: u64) {
        self.paused_until
            .fetch_max(now.saturating_add(backoff_ms), Ordering::SeqCst);
    }

    pub fn paused_until(&self) -> Timestamp {
        self.paused_until.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self, now: Timestamp) -> bool {
        now < self.paused_until()
    }

    pub fn resume(&self) {
        self.paused_until.store(0, Ordering::SeqCst);
    }
}

/// Unmined block plus what went into it.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub block: Block,
    pub selection: Selection,
}

impl BlockTemplate {
    pub fn parent_hash(&self) -> Hash {
        self.block.header.previous_hash
    }
}

/// Successful nonce search.
#[derive(Clone, Debug)]
pub struct MinedBlock {
    pub block: Block,
    pub attempts: u64,
    pub elapsed: Duration,
}

pub struct BlockAssembler {
    config: BlockProductionConfig,
    selector: TransactionSelector,
}

impl BlockAssembler {
    pub fn new(config: BlockProductionConfig) -> Self {
        let selector = TransactionSelector::new(
            config.max_transactions_per_block,
            config.max_block_size_bytes,
        );
        Self { config, selector }
    }

    pub fn config(&self) -> &BlockProductionConfig {
        &self.config
    }

    /// Build the next block on top of `parent`: selected transactions, the
    /// coinbase paying reward plus fees to `miner_address`, merkle root.
    ///
    /// Fails without `identity`; the header commits to the miner's key.
    pub fn assemble(
        &self,
        parent: &BlockHeader,
        pool: &TransactionPool,
        state: &StateManager,
        miner_address: Address,
        identity: Option<&Ed25519KeyPair>,
        now: Timestamp,
    ) -> Result<BlockTemplate> {
        let identity = identity.ok_or(BlockProductionError::MissingIdentity)?;
        let height = parent.index + 1;
        let timestamp = now.max(parent.timestamp);

        let selection = self.selector.select(pool, state);
        let coinbase = build_coinbase(height, miner_address, selection.total_fees, timestamp)?;

        let mut transactions = Vec::with_capacity(selection.transactions.len() + 1);
        transactions.push(coinbase);
        transactions.extend(selection.transactions.iter().cloned());

        let block = Block::template(
            height,
            parent.hash,
            timestamp,
            self.config.difficulty,
            *identity.public_key().as_bytes(),
            transactions,
        );
        Ok(BlockTemplate { block, selection })
    }
}

pub struct PowMiner {
    batch_size: u64,
}

impl PowMiner {
    pub fn new(batch_size: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Search nonces for `block` in batches, checking `control` between
    /// batches. Difficulty 0 accepts nonce 0 immediately.
    pub fn mine(
        &self,
        mut block: Block,
        control: &MiningControl,
        clock: &dyn TimeSource,
    ) -> Result<MinedBlock> {
        let started = Instant::now();
        let prefix = block.header.pow_prefix();
        let target = target(block.header.difficulty);
        let mut start: u64 = 0;
        let mut attempts: u64 = 0;

        loop {
            if control.is_stopped() {
                return Err(BlockProductionError::Stopped);
            }
            if control.is_paused(clock.now()) {
                return Err(BlockProductionError::Interrupted);
            }

            let end = start.saturating_add(self.batch_size);
            for nonce in start..end {
                attempts += 1;
                let hash = BlockHeader::hash_for_nonce(&prefix, nonce);
                if meets_target(&hash, &target) {
                    block.header.nonce = nonce;
                    block.header.hash = hash;
                    tracing::debug!(
                        "[lc-17] found nonce {} for block {} after {} attempts",
                        nonce,
                        block.index(),
                        attempts
                    );
                    return Ok(MinedBlock {
                        block,
                        attempts,
                        elapsed: started.elapsed(),
                    });
                }
            }

            if end == u64::MAX {
                return Err(BlockProductionError::NonceSpaceExhausted);
            }
            start = end;
        }
    }
}
