//! # Transaction Pool
//!
//! Pending transactions behind admission control.
//!
//! ## Indices
//!
//! - `by_hash`: entry lookup by txid
//! - `by_price`: priority order (best first, eviction from the back)
//! - `by_sender`: per-sender nonce order
//!
//! Every admitted entry holds reservations on its inputs in the confirmed
//! state, so no two pending entries can spend the same output.

use super::ban::BanTracker;
use super::config::MempoolConfig;
use super::entry::{MempoolEntry, PricedEntry};
use super::errors::Reject;
use super::status::{RejectionCounters, TxStatus};
use crate::ports::StateProvider;
use lc_04_state_management::StateError;
use ledger_telemetry::metrics;
use lru::LruCache;
use shared_types::{short_hex, Address, Hash, SystemTimeSource, TimeSource, Timestamp, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Outcome of a submission: the admitted txid or the reason it was refused.
pub type AdmissionResult = Result<Hash, Reject>;

pub struct TransactionPool {
    config: MempoolConfig,
    by_hash: HashMap<Hash, MempoolEntry>,
    by_price: BTreeSet<PricedEntry>,
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,
    total_bytes: usize,
    bans: BanTracker,
    /// Recent terminal states. Pending entries are answered from `by_hash`.
    statuses: LruCache<Hash, TxStatus>,
    counters: RejectionCounters,
    time: Arc<dyn TimeSource>,
}

impl fmt::Debug for TransactionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionPool")
            .field("pending", &self.by_hash.len())
            .field("total_bytes", &self.total_bytes)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl TransactionPool {
    pub fn new(config: MempoolConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(config: MempoolConfig, time: Arc<dyn TimeSource>) -> Self {
        let capacity = NonZeroUsize::new(config.status_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            bans: BanTracker::new(
                config.ban_threshold,
                config.ban_window_ms,
                config.ban_duration_ms,
            ),
            statuses: LruCache::new(capacity),
            config,
            by_hash: HashMap::new(),
            by_price: BTreeSet::new(),
            by_sender: HashMap::new(),
            total_bytes: 0,
            counters: RejectionCounters::default(),
            time,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn counters(&self) -> &RejectionCounters {
        &self.counters
    }

    pub fn get(&self, txid: &Hash) -> Option<&MempoolEntry> {
        self.by_hash.get(txid)
    }

    pub fn contains(&self, txid: &Hash) -> bool {
        self.by_hash.contains_key(txid)
    }

    /// Current or recent lifecycle state of `txid`.
    pub fn status_of(&self, txid: &Hash) -> Option<TxStatus> {
        if self.by_hash.contains_key(txid) {
            return Some(TxStatus::Pending);
        }
        self.statuses.peek(txid).copied()
    }

    pub fn banned_until(&self, sender: &Address) -> Option<Timestamp> {
        self.bans.banned_until(sender, self.time.now())
    }

    pub fn is_banned(&self, sender: &Address) -> bool {
        self.banned_until(sender).is_some()
    }

    /// Entries in priority order, best fee-rate first.
    pub fn by_fee_rate(&self) -> impl Iterator<Item = &MempoolEntry> + '_ {
        self.by_price
            .iter()
            .filter_map(move |p| self.by_hash.get(&p.txid))
    }

    /// A sender's entries in nonce order.
    pub fn sender_entries(&self, sender: &Address) -> impl Iterator<Item = &MempoolEntry> + '_ {
        self.by_sender
            .get(sender)
            .into_iter()
            .flat_map(|nonces| nonces.values())
            .filter_map(move |txid| self.by_hash.get(txid))
    }

    /// Senders with at least one pending entry.
    pub fn senders(&self) -> impl Iterator<Item = &Address> + '_ {
        self.by_sender.keys()
    }

    pub fn sender_count(&self, sender: &Address) -> usize {
        self.by_sender.get(sender).map_or(0, |m| m.len())
    }

    /// Pending transactions in priority order.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.by_fee_rate().map(|e| e.tx.clone()).collect()
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Run a submission through admission control.
    ///
    /// Banned senders are refused before any other check, so submissions
    /// during a ban only count as `banned`. A submission whose signature does
    /// not verify is refused without touching the claimed sender's ban window.
    pub fn submit(&mut self, tx: Transaction, state: &mut dyn StateProvider) -> AdmissionResult {
        let now = self.time.now();
        let txid = tx.txid;
        let sender = tx.sender;

        if let Some(until) = self.bans.banned_until(&sender, now) {
            return Err(self.refuse(txid, Some(&sender), Reject::Banned { until }, now));
        }
        if let Err(reject) = self.authenticate(&tx) {
            return Err(self.refuse(txid, None, reject, now));
        }

        match self.admit_authenticated(tx, state, now) {
            Ok(txid) => {
                self.counters.admitted_total += 1;
                metrics::record_admission();
                self.publish_occupancy();
                tracing::debug!(
                    "[lc-06] admitted {} from {} ({} pending)",
                    short_hex(&txid),
                    short_hex(&sender),
                    self.by_hash.len()
                );
                Ok(txid)
            }
            Err(reject) => Err(self.refuse(txid, Some(&sender), reject, now)),
        }
    }

    /// Count a rejection. `sender` is `None` when nothing proves who sent it,
    /// and then no ban credit is recorded.
    fn refuse(
        &mut self,
        txid: Hash,
        sender: Option<&Address>,
        reject: Reject,
        now: Timestamp,
    ) -> Reject {
        self.counters.record(&reject);
        metrics::record_rejection(reject.reason());

        if matches!(reject, Reject::Banned { .. }) {
            self.statuses.put(txid, TxStatus::RejectedBanned);
        } else if reject.counts_as_invalid() {
            self.statuses.put(txid, TxStatus::RejectedInvalid);
            let banned = match sender {
                Some(sender) => self.bans.record_invalid(sender, now).map(|until| (sender, until)),
                None => None,
            };
            if let Some((sender, until)) = banned {
                self.counters.bans_total += 1;
                tracing::warn!(
                    "[lc-06] sender {} banned until {} after repeated invalid submissions",
                    short_hex(sender),
                    until
                );
            }
        }

        tracing::debug!("[lc-06] rejected {}: {}", short_hex(&txid), reject);
        reject
    }

    /// Every check except the ban. Nothing is counted here.
    fn admit(
        &mut self,
        tx: Transaction,
        state: &mut dyn StateProvider,
        now: Timestamp,
    ) -> AdmissionResult {
        self.authenticate(&tx)?;
        self.admit_authenticated(tx, state, now)
    }

    /// Checks that need nothing but the transaction itself. Until these pass
    /// the `sender` field is only a claim.
    fn authenticate(&self, tx: &Transaction) -> Result<(), Reject> {
        if self.by_hash.contains_key(&tx.txid) {
            return Err(Reject::Duplicate(tx.txid));
        }
        if tx.is_coinbase() {
            return Err(Reject::Invalid("coinbase is not relayed".into()));
        }
        tx.check_structure()
            .map_err(|e| Reject::Invalid(e.to_string()))?;
        shared_crypto::verify_transaction(tx).map_err(|e| Reject::Invalid(e.to_string()))
    }

    fn admit_authenticated(
        &mut self,
        tx: Transaction,
        state: &mut dyn StateProvider,
        now: Timestamp,
    ) -> AdmissionResult {
        self.check_nonce(&tx, state)?;
        state.check_inputs(&tx)?;

        let entry = MempoolEntry::new(tx, now);
        if entry.fee_rate < self.config.min_fee_rate {
            return Err(Reject::LowFee {
                fee_rate: entry.fee_rate,
                minimum: self.config.min_fee_rate,
            });
        }
        if self.sender_count(&entry.sender()) >= self.config.max_per_sender {
            return Err(Reject::SenderLimit {
                limit: self.config.max_per_sender,
            });
        }

        let victims = self.eviction_plan(&entry)?;
        state
            .reserve_inputs(entry.txid(), &entry.tx.inputs)
            .map_err(|e| Reject::from(StateError::from(e)))?;
        for victim in victims {
            if self.remove_entry(&victim, TxStatus::Evicted, state).is_some() {
                self.counters.evicted_total += 1;
                tracing::debug!(
                    "[lc-06] evicted {} for higher fee-rate {}",
                    short_hex(&victim),
                    entry.fee_rate
                );
            }
        }

        let txid = entry.txid();
        self.insert_entry(entry);
        Ok(txid)
    }

    fn check_nonce(&self, tx: &Transaction, state: &dyn StateProvider) -> Result<(), Reject> {
        let expected = state.expected_nonce(&tx.sender);
        let taken = self
            .by_sender
            .get(&tx.sender)
            .is_some_and(|nonces| nonces.contains_key(&tx.nonce));
        if tx.nonce < expected || taken {
            return Err(Reject::NonceReplay {
                expected,
                actual: tx.nonce,
            });
        }
        if tx.nonce - expected > self.config.max_nonce_gap {
            return Err(Reject::NonceGap {
                expected,
                actual: tx.nonce,
                max_gap: self.config.max_nonce_gap,
            });
        }
        Ok(())
    }

    /// Entries to evict so `incoming` fits. Only strictly cheaper entries
    /// are eligible; otherwise the pool is full for this fee-rate.
    fn eviction_plan(&self, incoming: &MempoolEntry) -> Result<Vec<Hash>, Reject> {
        if incoming.size > self.config.max_bytes {
            return Err(Reject::PoolFull);
        }
        let mut count = self.by_hash.len() + 1;
        let mut bytes = self.total_bytes + incoming.size;
        let mut cheapest = self.by_price.iter().rev();
        let mut victims = Vec::new();

        while count > self.config.max_transactions || bytes > self.config.max_bytes {
            let Some(candidate) = cheapest.next() else {
                return Err(Reject::PoolFull);
            };
            if candidate.fee_rate >= incoming.fee_rate {
                return Err(Reject::PoolFull);
            }
            let size = self.by_hash.get(&candidate.txid).map_or(0, |e| e.size);
            count -= 1;
            bytes = bytes.saturating_sub(size);
            victims.push(candidate.txid);
        }
        Ok(victims)
    }

    fn insert_entry(&mut self, entry: MempoolEntry) {
        let txid = entry.txid();
        self.by_price.insert(entry.priced());
        self.by_sender
            .entry(entry.sender())
            .or_default()
            .insert(entry.nonce(), txid);
        self.total_bytes += entry.size;
        self.statuses.pop(&txid);
        self.by_hash.insert(txid, entry);
    }

    fn remove_entry(
        &mut self,
        txid: &Hash,
        status: TxStatus,
        state: &mut dyn StateProvider,
    ) -> Option<MempoolEntry> {
        let entry = self.by_hash.remove(txid)?;
        self.by_price.remove(&entry.priced());
        if let Some(nonces) = self.by_sender.get_mut(&entry.sender()) {
            nonces.remove(&entry.nonce());
            if nonces.is_empty() {
                self.by_sender.remove(&entry.sender());
            }
        }
        self.total_bytes = self.total_bytes.saturating_sub(entry.size);
        state.release_inputs(txid, &entry.tx.inputs);
        self.statuses.put(*txid, status);
        Some(entry)
    }

    fn publish_occupancy(&self) {
        metrics::set_mempool_occupancy(self.by_hash.len(), self.total_bytes);
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Drop entries older than the TTL. Returns the expired txids.
    pub fn expire(&mut self, now: Timestamp, state: &mut dyn StateProvider) -> Vec<Hash> {
        let ttl = self.config.ttl_ms;
        let stale: Vec<Hash> = self
            .by_hash
            .values()
            .filter(|e| now.saturating_sub(e.admission_time) >= ttl)
            .map(MempoolEntry::txid)
            .collect();

        for txid in &stale {
            self.remove_entry(txid, TxStatus::Expired, state);
        }
        self.counters.expired_total += stale.len() as u64;
        self.bans.prune(now);
        if !stale.is_empty() {
            tracing::info!("[lc-06] expired {} stale transactions", stale.len());
            self.publish_occupancy();
        }
        stale
    }

    /// Forget entries confirmed in a block. Returns how many were pending.
    pub fn remove_included(&mut self, txids: &[Hash], state: &mut dyn StateProvider) -> usize {
        let mut removed = 0;
        for txid in txids {
            if self.remove_entry(txid, TxStatus::Included, state).is_some() {
                removed += 1;
            } else if self.statuses.peek(txid).is_some() {
                self.statuses.put(*txid, TxStatus::Included);
            }
        }
        if removed > 0 {
            self.publish_occupancy();
        }
        removed
    }

    /// Re-check every entry after the confirmed state changed.
    ///
    /// Reservations are rebuilt from scratch in admission order, so when two
    /// entries now conflict the earlier one keeps the input. Returns the
    /// dropped txids.
    pub fn revalidate(&mut self, state: &mut dyn StateProvider) -> Vec<Hash> {
        state.clear_reservations();

        let mut order: Vec<(Timestamp, Hash)> = self
            .by_hash
            .values()
            .map(|e| (e.admission_time, e.txid()))
            .collect();
        order.sort_unstable();

        let mut dropped = Vec::new();
        for (_, txid) in order {
            let Some(entry) = self.by_hash.get(&txid) else {
                continue;
            };
            let expected = state.expected_nonce(&entry.sender());
            let verdict = if entry.nonce() < expected {
                Err(Reject::NonceReplay {
                    expected,
                    actual: entry.nonce(),
                })
            } else {
                state
                    .check_inputs(&entry.tx)
                    .map_err(Reject::from)
                    .and_then(|_| {
                        state
                            .reserve_inputs(txid, &entry.tx.inputs)
                            .map_err(|e| Reject::from(StateError::from(e)))
                    })
            };
            if let Err(reject) = verdict {
                tracing::debug!("[lc-06] dropping {} on revalidation: {}", short_hex(&txid), reject);
                dropped.push(txid);
            }
        }

        for txid in &dropped {
            self.remove_entry(txid, TxStatus::RejectedInvalid, state);
        }
        if !dropped.is_empty() {
            self.publish_occupancy();
        }
        dropped
    }

    /// Offer transactions orphaned by a reorg back to the pool.
    ///
    /// They pass full admission but never count toward bans or rejection
    /// counters. Returns how many were admitted.
    pub fn readmit(&mut self, mut txs: Vec<Transaction>, state: &mut dyn StateProvider) -> usize {
        txs.sort_by_key(|tx| (tx.sender, tx.nonce));
        let now = self.time.now();
        let mut admitted = 0;
        for tx in txs {
            if tx.is_coinbase() {
                continue;
            }
            let txid = tx.txid;
            match self.admit(tx, state, now) {
                Ok(_) => admitted += 1,
                Err(reject) => {
                    tracing::debug!("[lc-06] orphan {} not readmitted: {}", short_hex(&txid), reject)
                }
            }
        }
        if admitted > 0 {
            tracing::info!("[lc-06] readmitted {} orphaned transactions", admitted);
            self.publish_occupancy();
        }
        admitted
    }

    /// Drop every entry and reservation.
    pub fn clear(&mut self, state: &mut dyn StateProvider) {
        let txids: Vec<Hash> = self.by_hash.keys().copied().collect();
        for txid in &txids {
            self.remove_entry(txid, TxStatus::Evicted, state);
        }
        self.publish_occupancy();
    }
}
