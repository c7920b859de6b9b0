use super::errors::Reject;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a transaction as seen by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Included,
    Evicted,
    Expired,
    RejectedInvalid,
    RejectedBanned,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Per-instance admission counters.
///
/// Mirrors the global Prometheus counters, but scoped to one pool so callers
/// can read exact values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounters {
    pub admitted_total: u64,
    pub rejected_invalid_total: u64,
    pub rejected_banned_total: u64,
    pub rejected_low_fee_total: u64,
    pub rejected_duplicate_total: u64,
    pub rejected_pool_full_total: u64,
    pub rejected_sender_limit_total: u64,
    pub evicted_total: u64,
    pub expired_total: u64,
    pub bans_total: u64,
}

impl RejectionCounters {
    pub(crate) fn record(&mut self, reject: &Reject) {
        match reject {
            Reject::Banned { .. } => self.rejected_banned_total += 1,
            Reject::LowFee { .. } => self.rejected_low_fee_total += 1,
            Reject::Duplicate(_) => self.rejected_duplicate_total += 1,
            Reject::PoolFull => self.rejected_pool_full_total += 1,
            Reject::SenderLimit { .. } => self.rejected_sender_limit_total += 1,
            r if r.counts_as_invalid() => self.rejected_invalid_total += 1,
            _ => {}
        }
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_invalid_total
            + self.rejected_banned_total
            + self.rejected_low_fee_total
            + self.rejected_duplicate_total
            + self.rejected_pool_full_total
            + self.rejected_sender_limit_total
    }
}
