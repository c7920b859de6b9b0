//! # Chain Manager
//!
//! Owns the canonical chain, the confirmed state and the mempool behind one
//! ledger lock, and is the only writer of all three.
//!
//! ## Mining Flow
//!
//! 1. Assemble a template under the lock
//! 2. Search nonces with the lock released
//! 3. Re-lock, check the tip did not move, validate, apply, persist
//!
//! ## Fork Choice
//!
//! Longest valid chain, except that no candidate may change a block at or
//! below the highest finalized height. Finality beats length.

use crate::config::ChainConfig;
use crate::domain::{
    build_genesis, BlockValidator, ChainSnapshot, ReorgSummary, TransactionRecord,
};
use crate::error::{BlockValidationError, ChainError, ChainResult};
use crate::ports::{Broadcaster, PeerClient};
use crate::recovery::recover_chain;
use lc_02_block_storage::ChainStore;
use lc_04_state_management::{StateManager, Utxo};
use lc_06_mempool::{RejectionCounters, TransactionPool, TxStatus};
use lc_09_finality::FinalityManager;
use lc_17_block_production::{BlockAssembler, MiningControl, PowMiner};
use parking_lot::Mutex;
use shared_crypto::Ed25519KeyPair;
use shared_types::{
    short_hex, Address, Amount, Block, Hash, TimeSource, Timestamp, Transaction,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;


/// Everything guarded by the ledger lock.
pub struct LedgerState {
    /// Never empty; index 0 is genesis.
    pub chain: Vec<Block>,
    pub state: StateManager,
    pub mempool: TransactionPool,
}

impl LedgerState {
    fn tip(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    fn height(&self) -> u64 {
        self.tip().index()
    }

    /// Drop confirmed entries and rebuild reservations against the new state.
    fn settle_mempool(&mut self, included: &[Hash]) {
        self.mempool.remove_included(included, &mut self.state);
        self.mempool.revalidate(&mut self.state);
    }
}

/// Collaborators injected into the chain manager.
pub struct ChainDependencies {
    pub store: ChainStore,
    pub time: Arc<dyn TimeSource>,
    pub finality: Option<Arc<FinalityManager>>,
    pub broadcaster: Option<Arc<dyn Broadcaster>>,
}

impl ChainDependencies {
    pub fn new(store: ChainStore, time: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            time,
            finality: None,
            broadcaster: None,
        }
    }

    pub fn with_finality(mut self, finality: Arc<FinalityManager>) -> Self {
        self.finality = Some(finality);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }
}

/// Result of one `sync_with_network` pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub queried: usize,
    pub responded: usize,
    /// Peers that claimed a longer chain.
    pub ahead: usize,
    pub adopted: Option<ReorgSummary>,
    /// `(peer, reason)` for every skipped peer or rejected candidate.
    pub failures: Vec<(String, String)>,
}

pub struct ChainManager {
    config: ChainConfig,
    store: ChainStore,
    time: Arc<dyn TimeSource>,
    finality: Option<Arc<FinalityManager>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    validator: BlockValidator,
    assembler: BlockAssembler,
    miner: PowMiner,
    control: Arc<MiningControl>,
    genesis_hash: Hash,
    ledger: Mutex<LedgerState>,
}

impl ChainManager {
    /// Recover the chain from storage, or initialize it at genesis.
    ///
    /// Fails when storage is corrupt at or below the newest checkpoint, or
    /// when the recovered chain does not contain the finalized block.
    pub fn open(config: ChainConfig, deps: ChainDependencies) -> ChainResult<Self> {
        config.validate().map_err(ChainError::InvalidConfig)?;
        let genesis = build_genesis(&config.genesis);
        let validator = BlockValidator::new(&config);

        let recovered = recover_chain(
            &deps.store,
            &genesis,
            &validator,
            config.delta_retention,
            deps.time.now(),
        )?;

        if let Some((height, finalized)) = deps.finality.as_ref().and_then(|f| f.highest_finalized()) {
            match recovered.chain.get(height as usize) {
                Some(block) if block.hash() == finalized => {}
                Some(_) => {
                    return Err(ChainError::Recovery(format!(
                        "finalized block {} at height {height} missing from recovered chain",
                        short_hex(&finalized)
                    )))
                }
                None => {
                    return Err(ChainError::Recovery(format!(
                        "recovered height {} below finalized height {height}",
                        recovered.chain.len() - 1
                    )))
                }
            }
        }

        let mempool = TransactionPool::with_time_source(config.mempool.clone(), deps.time.clone());
        let ledger = LedgerState {
            chain: recovered.chain,
            state: recovered.state,
            mempool,
        };
        ledger_telemetry::metrics::set_chain_height(ledger.height());

        Ok(Self {
            assembler: BlockAssembler::new(config.production.clone()),
            miner: PowMiner::new(config.production.nonce_batch_size),
            control: Arc::new(MiningControl::new()),
            genesis_hash: genesis.hash(),
            store: deps.store,
            time: deps.time,
            finality: deps.finality,
            broadcaster: deps.broadcaster,
            validator,
            config,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn mining_control(&self) -> Arc<MiningControl> {
        Arc::clone(&self.control)
    }

    pub fn finality(&self) -> Option<&Arc<FinalityManager>> {
        self.finality.as_ref()
    }

    /// Current time on the injected clock.
    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Run mempool admission and gossip the transaction if admitted.
    pub fn submit_transaction(&self, tx: Transaction) -> ChainResult<Hash> {
        let txid = {
            let mut guard = self.ledger.lock();
            let ledger = &mut *guard;
            ledger.mempool.submit(tx.clone(), &mut ledger.state)?
        };
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast_transaction(&tx);
        }
        Ok(txid)
    }

    /// Drop mempool entries older than the TTL.
    pub fn expire_mempool(&self) -> Vec<Hash> {
        let now = self.time.now();
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        ledger.mempool.expire(now, &mut ledger.state)
    }

    // =========================================================================
    // BLOCK PRODUCTION
    // =========================================================================

    /// Mine one block from the mempool and make it the new tip.
    ///
    /// Fails with `StaleTip` if another block was accepted while mining, and
    /// with `Production(Interrupted)` while mining is paused.
    pub fn mine_pending_transactions(
        &self,
        miner_address: Address,
        identity: Option<&Ed25519KeyPair>,
    ) -> ChainResult<Block> {
        let template = {
            let ledger = self.ledger.lock();
            self.assembler.assemble(
                &ledger.tip().header,
                &ledger.mempool,
                &ledger.state,
                miner_address,
                identity,
                self.time.now(),
            )?
        };
        let selected = template.selection.transactions.len();
        let mined = self
            .miner
            .mine(template.block, &self.control, self.time.as_ref())?;
        let block = mined.block;

        {
            let mut guard = self.ledger.lock();
            let ledger = &mut *guard;
            let tip = ledger.tip().hash();
            if tip != block.header.previous_hash {
                return Err(ChainError::StaleTip {
                    expected: block.header.previous_hash,
                    actual: tip,
                });
            }
            self.commit_block(ledger, block.clone())?;
        }

        ledger_telemetry::metrics::record_block_mined(mined.elapsed.as_secs_f64());
        tracing::info!(
            "[lc-08] ⛏ mined block {} ({}) with {} transactions after {} attempts",
            block.index(),
            short_hex(&block.hash()),
            selected,
            mined.attempts
        );
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast_block(&block);
        }
        Ok(block)
    }

    /// Extend the tip with one block received from a peer and back off local
    /// mining. Returns `false` if the block is already on the chain.
    pub fn accept_peer_block(&self, block: Block) -> ChainResult<bool> {
        {
            let mut guard = self.ledger.lock();
            let ledger = &mut *guard;
            let tip = ledger.height();
            let index = block.index();
            if index <= tip && ledger.chain[index as usize].hash() == block.hash() {
                return Ok(false);
            }
            if index != tip + 1 || block.header.previous_hash != ledger.tip().hash() {
                return Err(ChainError::Detached { index, tip });
            }
            self.commit_block(ledger, block)?;
        }
        self.control
            .pause_for(self.time.now(), self.config.production.mining_backoff_ms);
        Ok(true)
    }

    /// Validate, apply and persist `block` on top of the current tip.
    fn commit_block(&self, ledger: &mut LedgerState, block: Block) -> ChainResult<()> {
        let height = block.index();
        self.validator
            .check_block(&block, &ledger.tip().header, self.time.now())
            .map_err(|reason| ChainError::invalid(height, reason))?;
        ledger
            .state
            .apply_block(&block)
            .map_err(|e| ChainError::invalid(height, e))?;

        if let Err(e) = self.persist_block(&ledger.state, &block) {
            tracing::error!("[lc-08] failed to persist block {}: {}", height, e);
            ledger.state.rollback_block()?;
            ledger.mempool.revalidate(&mut ledger.state);
            return Err(e);
        }

        let included = block.txids();
        ledger.chain.push(block);
        ledger.settle_mempool(&included);
        ledger_telemetry::metrics::set_chain_height(height);
        Ok(())
    }

    fn persist_block(&self, state: &StateManager, block: &Block) -> ChainResult<()> {
        self.store.put_block(block)?;
        if block.index() % self.config.checkpoint_interval == 0 {
            self.store
                .put_checkpoint(block.index(), &ChainSnapshot::capture(state))?;
            tracing::debug!("[lc-08] checkpoint at height {}", block.index());
        }
        Ok(())
    }

    // =========================================================================
    // FORK CHOICE
    // =========================================================================

    /// Adopt `candidate` if it is valid, strictly longer, and keeps every
    /// finalized block. On any failure the current chain stays untouched.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> ChainResult<ReorgSummary> {
        let genesis = candidate.first().ok_or(ChainError::EmptyChain)?;
        if genesis.hash() != self.genesis_hash {
            return Err(ChainError::invalid(0, BlockValidationError::GenesisMismatch));
        }

        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        let current = ledger.chain.len();
        if candidate.len() <= current {
            return Err(ChainError::NotLonger {
                candidate: candidate.len(),
                current,
            });
        }
        self.check_finality(&candidate)?;

        let fork = ledger
            .chain
            .iter()
            .zip(&candidate)
            .position(|(ours, theirs)| ours.hash() != theirs.hash())
            .unwrap_or(current);
        let ancestor = fork - 1;

        let mut next = self.rewind(ledger, ancestor)?;
        let mut checkpoints = Vec::new();
        let now = self.time.now();
        for i in fork..candidate.len() {
            let block = &candidate[i];
            let height = block.index();
            self.validator
                .check_block(block, &candidate[i - 1].header, now)
                .map_err(|reason| ChainError::invalid(height, reason))?;
            next.apply_block(block)
                .map_err(|e| ChainError::invalid(height, e))?;
            if height % self.config.checkpoint_interval == 0 {
                checkpoints.push(ChainSnapshot::capture(&next));
            }
        }

        // Checkpoints of the abandoned branch go first: a crash part way
        // through leaves at worst a mixed block range above the ancestor,
        // which recovery truncates.
        self.store.delete_checkpoints_above(ancestor as u64)?;
        for block in &candidate[fork..] {
            self.store.put_block(block)?;
        }
        for checkpoint in &checkpoints {
            self.store.put_checkpoint(checkpoint.height, checkpoint)?;
        }

        let old_tip = ledger.tip().hash();
        let old_height = ledger.height();
        let orphaned: Vec<Block> = ledger.chain.split_off(fork);
        ledger.chain.extend(candidate.into_iter().skip(fork));
        ledger.state = next;

        let mut included = Vec::new();
        for block in &ledger.chain[fork..] {
            included.extend(block.txids());
        }
        let confirmed: HashSet<Hash> = included.iter().copied().collect();
        let orphans: Vec<Transaction> = orphaned
            .iter()
            .flat_map(|b| b.user_transactions())
            .filter(|tx| !confirmed.contains(&tx.txid))
            .cloned()
            .collect();
        ledger.settle_mempool(&included);
        let readmitted = ledger.mempool.readmit(orphans, &mut ledger.state);

        let summary = ReorgSummary {
            common_ancestor: ancestor as u64,
            old_height,
            old_tip,
            new_height: ledger.height(),
            new_tip: ledger.tip().hash(),
            rolled_back: orphaned.len(),
            applied: ledger.chain.len() - fork,
            readmitted,
        };
        if summary.rolled_back > 0 {
            ledger_telemetry::metrics::record_reorg();
        }
        ledger_telemetry::metrics::set_chain_height(summary.new_height);
        tracing::info!(
            "[lc-08] 🔀 adopted chain {} at height {} (ancestor {}, {} rolled back, {} applied)",
            short_hex(&summary.new_tip),
            summary.new_height,
            summary.common_ancestor,
            summary.rolled_back,
            summary.applied
        );
        Ok(summary)
    }

    fn check_finality(&self, candidate: &[Block]) -> ChainResult<()> {
        let Some((height, finalized)) = self.finality.as_ref().and_then(|f| f.highest_finalized())
        else {
            return Ok(());
        };
        match candidate.get(height as usize) {
            Some(block) if block.hash() == finalized => Ok(()),
            _ => {
                tracing::warn!(
                    "[lc-08] vetoed candidate chain rewriting finalized height {}",
                    height
                );
                Err(ChainError::FinalityViolation { height, finalized })
            }
        }
    }

    /// Copy of the confirmed state rolled back to `ancestor`. Rebuilds from
    /// genesis when the delta log is not deep enough.
    fn rewind(&self, ledger: &LedgerState, ancestor: usize) -> ChainResult<StateManager> {
        let depth = ledger.chain.len() - 1 - ancestor;
        let mut next = ledger.state.clone();
        next.clear_reservations();
        if depth <= next.rollback_depth() {
            for _ in 0..depth {
                next.rollback_block()?;
            }
            return Ok(next);
        }

        tracing::warn!(
            "[lc-08] reorg depth {} exceeds delta log; rebuilding from genesis",
            depth
        );
        let mut rebuilt = StateManager::new(self.config.delta_retention);
        for block in &ledger.chain[..=ancestor] {
            rebuilt.apply_block(block)?;
        }
        Ok(rebuilt)
    }

    // =========================================================================
    // NETWORK SYNC
    // =========================================================================

    /// Probe every peer, then try to adopt the longest advertised chain.
    ///
    /// Peers that time out or fail are skipped. Candidates are tried longest
    /// first; the first one that passes `replace_chain` wins.
    pub async fn sync_with_network(&self, peers: &[Arc<dyn PeerClient>]) -> SyncReport {
        let budget = Duration::from_millis(self.config.peer_timeout_ms);
        let fetch = Duration::from_millis(self.config.fetch_timeout_ms);
        let mut report = SyncReport {
            queried: peers.len(),
            ..SyncReport::default()
        };

        let local = self.height();
        let mut ahead = Vec::new();
        for peer in peers {
            match tokio::time::timeout(budget, peer.chain_info()).await {
                Ok(Ok(info)) => {
                    report.responded += 1;
                    if info.height > local {
                        ahead.push((info.height, Arc::clone(peer)));
                    }
                }
                Ok(Err(e)) => report.failures.push((peer.id(), e)),
                Err(_) => {
                    tracing::debug!("[lc-08] peer {} timed out", peer.id());
                    report.failures.push((peer.id(), "timed out".into()));
                }
            }
        }
        report.ahead = ahead.len();
        ahead.sort_by(|a, b| b.0.cmp(&a.0));

        for (claimed, peer) in ahead {
            let blocks = match tokio::time::timeout(fetch, peer.fetch_blocks()).await {
                Ok(Ok(blocks)) => blocks,
                Ok(Err(e)) => {
                    report.failures.push((peer.id(), e));
                    continue;
                }
                Err(_) => {
                    report.failures.push((peer.id(), "fetch timed out".into()));
                    continue;
                }
            };
            match self.replace_chain(blocks) {
                Ok(summary) => {
                    report.adopted = Some(summary);
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        "[lc-08] chain from {} (height {}) rejected: {}",
                        peer.id(),
                        claimed,
                        e
                    );
                    report.failures.push((peer.id(), e.to_string()));
                }
            }
        }
        report
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Index of the tip.
    pub fn height(&self) -> u64 {
        self.ledger.lock().height()
    }

    pub fn tip_hash(&self) -> Hash {
        self.ledger.lock().tip().hash()
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.ledger.lock().chain.clone()
    }

    pub fn block_at(&self, height: u64) -> Option<Block> {
        self.ledger.lock().chain.get(height as usize).cloned()
    }

    pub fn get_balance(&self, address: &Address) -> Amount {
        self.ledger.lock().state.balance_of(address)
    }

    pub fn get_unspent_output(&self, txid: &Hash, vout: u32, exclude_pending: bool) -> Option<Utxo> {
        self.ledger
            .lock()
            .state
            .get_unspent_output(txid, vout, exclude_pending)
    }

    pub fn expected_nonce(&self, address: &Address) -> u64 {
        self.ledger.lock().state.expected_nonce(address)
    }

    /// Confirmed transactions touching `address`, newest first. Skips the
    /// `offset` most recent and returns at most `limit`.
    pub fn get_transaction_history_window(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> Vec<TransactionRecord> {
        let ledger = self.ledger.lock();
        ledger
            .chain
            .iter()
            .rev()
            .flat_map(|block| {
                block
                    .transactions
                    .iter()
                    .rev()
                    .filter(|tx| tx.touches(address))
                    .map(move |tx| TransactionRecord {
                        height: block.index(),
                        block_hash: block.hash(),
                        transaction: tx.clone(),
                    })
            })
            .skip(offset)
            .take(limit)
            .collect()
    }

    pub fn compute_state_snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::capture(&self.ledger.lock().state)
    }

    pub fn transaction_status(&self, txid: &Hash) -> Option<TxStatus> {
        self.ledger.lock().mempool.status_of(txid)
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().mempool.pending_transactions()
    }

    pub fn mempool_len(&self) -> usize {
        self.ledger.lock().mempool.len()
    }

    pub fn mempool_counters(&self) -> RejectionCounters {
        self.ledger.lock().mempool.counters().clone()
    }

    /// Run `f` with the ledger locked.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.ledger.lock())
    }
}
