use serde::{Deserialize, Serialize};

/// Mempool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum transactions in the pool.
    pub max_transactions: usize,
    /// Maximum total serialized bytes in the pool.
    pub max_bytes: usize,
    /// Minimum fee-rate, base units per 1000 bytes.
    pub min_fee_rate: u64,
    /// Maximum pending transactions per sender.
    pub max_per_sender: usize,
    /// How far past the confirmed next nonce a pending nonce may be.
    pub max_nonce_gap: u64,
    /// Invalid submissions tolerated inside one window before a ban.
    pub ban_threshold: u32,
    /// Sliding window for invalid submissions (milliseconds).
    pub ban_window_ms: u64,
    /// Ban length (milliseconds).
    pub ban_duration_ms: u64,
    /// Pending transactions older than this are expired (milliseconds).
    pub ttl_ms: u64,
    /// Capacity of the recent terminal status cache.
    pub status_cache_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 5_000,
            max_bytes: 8 * 1024 * 1024,
            min_fee_rate: 1_000, // 1 unit per byte
            max_per_sender: 16,
            max_nonce_gap: 16,
            ban_threshold: 5,
            ban_window_ms: 60_000,      // 1 minute
            ban_duration_ms: 600_000,   // 10 minutes
            ttl_ms: 3 * 60 * 60 * 1000, // 3 hours
            status_cache_size: 10_000,
        }
    }
}

impl MempoolConfig {
    /// Creates a small config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_transactions: 100,
            max_bytes: 1024 * 1024,
            max_per_sender: 4,
            max_nonce_gap: 4,
            ban_threshold: 3,
            ban_window_ms: 10_000,
            ban_duration_ms: 30_000,
            ttl_ms: 60_000,
            status_cache_size: 256,
            ..Default::default()
        }
    }
}
