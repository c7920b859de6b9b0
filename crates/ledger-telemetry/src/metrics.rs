//! Prometheus metrics for the ledger engine.
//!
//! All metrics follow the naming convention: `lc_<subsystem>_<metric>_<unit>`
//!
//! Metrics are usable before `register_metrics` is called; registration only
//! makes them visible to `gather_metrics`.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::sync::{Arc, OnceLock};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MEMPOOL METRICS
    // =========================================================================

    /// Current mempool size (transaction count)
    pub static ref MEMPOOL_PENDING: Gauge = Gauge::new(
        "lc_mempool_transactions_pending",
        "Number of pending transactions in mempool"
    ).expect("metric creation failed");

    /// Current mempool size (bytes)
    pub static ref MEMPOOL_BYTES: Gauge = Gauge::new(
        "lc_mempool_size_bytes",
        "Total size of pending transactions in bytes"
    ).expect("metric creation failed");

    /// Transactions admitted
    pub static ref MEMPOOL_ADMITTED: IntCounter = IntCounter::new(
        "lc_mempool_admitted_total",
        "Total transactions admitted into the mempool"
    ).expect("metric creation failed");

    /// Rejections by reason
    pub static ref MEMPOOL_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("lc_mempool_rejected_total", "Transactions rejected at admission"),
        &["reason"]  // reason: invalid/banned/low_fee/nonce_gap/...
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCK PRODUCTION METRICS
    // =========================================================================

    /// Blocks mined locally
    pub static ref BLOCKS_MINED: IntCounter = IntCounter::new(
        "lc_blocks_mined_total",
        "Total number of blocks mined by this node"
    ).expect("metric creation failed");

    /// Nonce search duration
    pub static ref POW_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "lc_pow_search_duration_seconds",
            "Time spent searching for a valid nonce"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // CHAIN METRICS
    // =========================================================================

    /// Current chain height
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "lc_chain_height",
        "Current canonical chain height"
    ).expect("metric creation failed");

    /// Chain replacements
    pub static ref CHAIN_REORGS: IntCounter = IntCounter::new(
        "lc_chain_reorgs_total",
        "Total number of accepted chain replacements"
    ).expect("metric creation failed");

    // =========================================================================
    // FINALITY METRICS
    // =========================================================================

    /// Current finalized height
    pub static ref FINALIZED_HEIGHT: Gauge = Gauge::new(
        "lc_finality_finalized_height",
        "Height of the last finalized block"
    ).expect("metric creation failed");

    /// Votes by outcome
    pub static ref FINALITY_VOTES: IntCounterVec = IntCounterVec::new(
        Opts::new("lc_finality_votes_total", "Finality votes processed"),
        &["result"]  // result: counted/duplicate/rejected/finalized
    ).expect("metric creation failed");

    /// Slashing events by misbehavior type
    pub static ref SLASHING_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("lc_slashing_events_total", "Slashing penalties applied"),
        &["type"]
    ).expect("metric creation failed");
}

/// Handle returned once metrics are registered.
#[derive(Clone)]
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

/// Register all metrics with the global registry. Repeated calls are no-ops.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let outcome = REGISTERED.get_or_init(|| {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            // Mempool
            Box::new(MEMPOOL_PENDING.clone()),
            Box::new(MEMPOOL_BYTES.clone()),
            Box::new(MEMPOOL_ADMITTED.clone()),
            Box::new(MEMPOOL_REJECTED.clone()),
            // Block production
            Box::new(BLOCKS_MINED.clone()),
            Box::new(POW_DURATION.clone()),
            // Chain
            Box::new(CHAIN_HEIGHT.clone()),
            Box::new(CHAIN_REORGS.clone()),
            // Finality
            Box::new(FINALIZED_HEIGHT.clone()),
            Box::new(FINALITY_VOTES.clone()),
            Box::new(SLASHING_EVENTS.clone()),
        ];
        for metric in metrics {
            REGISTRY.register(metric).map_err(|e| e.to_string())?;
        }
        Ok(())
    });

    outcome
        .clone()
        .map_err(TelemetryError::MetricsInit)
        .map(|()| MetricsHandle {
            _registry: Arc::new(REGISTRY.clone()),
        })
}

/// Encode all registered metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Update mempool occupancy gauges.
pub fn set_mempool_occupancy(count: usize, bytes: usize) {
    MEMPOOL_PENDING.set(count as f64);
    MEMPOOL_BYTES.set(bytes as f64);
}

/// Record an admitted transaction.
pub fn record_admission() {
    MEMPOOL_ADMITTED.inc();
}

/// Record an admission rejection by reason label.
pub fn record_rejection(reason: &str) {
    MEMPOOL_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a locally mined block and its nonce search time.
pub fn record_block_mined(pow_seconds: f64) {
    BLOCKS_MINED.inc();
    POW_DURATION.observe(pow_seconds);
}

/// Update the canonical height gauge.
pub fn set_chain_height(height: u64) {
    CHAIN_HEIGHT.set(height as f64);
}

/// Record an accepted chain replacement.
pub fn record_reorg() {
    CHAIN_REORGS.inc();
}

/// Update the finalized height gauge.
pub fn set_finalized_height(height: u64) {
    FINALIZED_HEIGHT.set(height as f64);
}

/// Record a vote outcome.
pub fn record_vote(result: &str) {
    FINALITY_VOTES.with_label_values(&[result]).inc();
}

/// Record a slashing penalty.
pub fn record_slashing(kind: &str) {
    SLASHING_EVENTS.with_label_values(&[kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_gather_contains_registered_names() {
        register_metrics().unwrap();
        record_rejection("low_fee");
        set_chain_height(3);
        let text = gather_metrics().unwrap();
        assert!(text.contains("lc_mempool_rejected_total"));
        assert!(text.contains("lc_chain_height"));
    }

    #[test]
    fn test_counter_increment() {
        let before = MEMPOOL_ADMITTED.get();
        record_admission();
        assert!(MEMPOOL_ADMITTED.get() > before);
    }
}
