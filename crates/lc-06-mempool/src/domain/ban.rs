//! # Sender Ban Tracker
//!
//! Counts invalid submissions per sender inside a sliding window. A sender
//! whose count exceeds the threshold is banned for a fixed duration. Bans
//! always expire.

use shared_types::{Address, Timestamp};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
struct SenderRecord {
    /// Timestamps of invalid submissions still inside the window.
    failures: VecDeque<Timestamp>,
    banned_until: Option<Timestamp>,
}

#[derive(Debug)]
pub struct BanTracker {
    records: HashMap<Address, SenderRecord>,
    threshold: u32,
    window_ms: u64,
    duration_ms: u64,
}

impl BanTracker {
    pub fn new(threshold: u32, window_ms: u64, duration_ms: u64) -> Self {
        Self {
            records: HashMap::new(),
            threshold,
            window_ms,
            duration_ms,
        }
    }

    /// End of the active ban, if any.
    pub fn banned_until(&self, sender: &Address, now: Timestamp) -> Option<Timestamp> {
        self.records
            .get(sender)
            .and_then(|r| r.banned_until)
            .filter(|until| now < *until)
    }

    /// Invalid submissions currently inside the window.
    pub fn invalid_count(&self, sender: &Address, now: Timestamp) -> usize {
        let horizon = now.saturating_sub(self.window_ms);
        self.records
            .get(sender)
            .map(|r| r.failures.iter().filter(|t| **t > horizon).count())
            .unwrap_or(0)
    }

    /// Record one invalid submission. Returns the ban end if this one tipped
    /// the sender over the threshold.
    pub fn record_invalid(&mut self, sender: &Address, now: Timestamp) -> Option<Timestamp> {
        let horizon = now.saturating_sub(self.window_ms);
        let record = self.records.entry(*sender).or_default();
        while record.failures.front().is_some_and(|t| *t <= horizon) {
            record.failures.pop_front();
        }
        record.failures.push_back(now);

        if record.failures.len() > self.threshold as usize {
            let until = now.saturating_add(self.duration_ms);
            record.banned_until = Some(until);
            record.failures.clear();
            return Some(until);
        }
        None
    }

    /// Forget senders with no active ban and no failures inside the window.
    pub fn prune(&mut self, now: Timestamp) {
        let horizon = now.saturating_sub(self.window_ms);
        self.records.retain(|_, record| {
            while record.failures.front().is_some_and(|t| *t <= horizon) {
                record.failures.pop_front();
            }
            let banned = record.banned_until.is_some_and(|until| now < until);
            banned || !record.failures.is_empty()
        });
    }

    pub fn tracked_senders(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MALLORY: Address = [0x66; 20];

    #[test]
    fn test_ban_after_threshold_exceeded() {
        let mut bans = BanTracker::new(2, 1_000, 5_000);
        assert_eq!(bans.record_invalid(&MALLORY, 100), None);
        assert_eq!(bans.record_invalid(&MALLORY, 200), None);
        assert_eq!(bans.record_invalid(&MALLORY, 300), Some(5_300));

        assert_eq!(bans.banned_until(&MALLORY, 301), Some(5_300));
        assert_eq!(bans.banned_until(&MALLORY, 5_300), None);
    }

    #[test]
    fn test_window_slides() {
        let mut bans = BanTracker::new(2, 1_000, 5_000);
        bans.record_invalid(&MALLORY, 0);
        bans.record_invalid(&MALLORY, 500);
        // First failure has left the window.
        assert_eq!(bans.record_invalid(&MALLORY, 1_200), None);
        assert_eq!(bans.invalid_count(&MALLORY, 1_200), 2);
        assert_eq!(bans.banned_until(&MALLORY, 1_200), None);
    }

    #[test]
    fn test_prune_keeps_active_bans() {
        let mut bans = BanTracker::new(0, 1_000, 5_000);
        bans.record_invalid(&MALLORY, 0);
        bans.record_invalid(&[0x01; 20], 10);
        bans.prune(2_000);
        assert_eq!(bans.tracked_senders(), 2);
        bans.prune(6_000);
        assert_eq!(bans.tracked_senders(), 0);
    }
}
