//! # Slashing
//!
//! Stake penalties for validator misbehavior. Each penalty is a percentage of
//! the validator's *current* stake, so repeated slashes compound.
//!
//! | Misbehavior | Penalty |
//! |-------------|---------|
//! | `DoubleSigning` | 10% |
//! | `Equivocation` | 5% |
//! | `InvalidBlockProposal` | 2% |
//! | `Offline` | 1% |
//!
//! A validator slashed `tombstone_threshold` times is tombstoned and removed
//! from the validator set for good.

use super::double_sign::DoubleSignProof;
use super::tombstone::TombstoneRegistry;
use super::validator_set::ValidatorSetManager;
use crate::config::SlashingConfig;
use crate::error::{FinalityError, FinalityResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{short_hex, Address, Amount, TimeSource, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MisbehaviorType {
    DoubleSigning,
    Offline,
    Equivocation,
    InvalidBlockProposal,
}

impl MisbehaviorType {
    pub fn penalty_percent(&self) -> u64 {
        match self {
            Self::DoubleSigning => 10,
            Self::Offline => 1,
            Self::Equivocation => 5,
            Self::InvalidBlockProposal => 2,
        }
    }

    /// Amount taken from `stake`, rounded down.
    pub fn penalty_on(&self, stake: Amount) -> Amount {
        (stake as u128 * self.penalty_percent() as u128 / 100) as Amount
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DoubleSigning => "double_signing",
            Self::Offline => "offline",
            Self::Equivocation => "equivocation",
            Self::InvalidBlockProposal => "invalid_block_proposal",
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingRecord {
    #[serde_as(as = "Hex")]
    pub validator: Address,
    pub misbehavior: MisbehaviorType,
    pub height: u64,
    pub stake_before: Amount,
    pub penalty: Amount,
    pub stake_after: Amount,
    /// Slashes against this validator including this one.
    pub slashed_count: u32,
    pub tombstoned: bool,
    pub at: Timestamp,
}

/// Callback the finality layer invokes on a detected double sign.
pub trait SlashingHandler: Send + Sync {
    /// Returns the applied record, or `None` if nothing could be slashed.
    fn on_double_sign(&self, proof: &DoubleSignProof) -> Option<SlashingRecord>;
}

#[derive(Debug, Default)]
struct SlashLedger {
    counts: HashMap<Address, u32>,
    records: Vec<SlashingRecord>,
}

pub struct SlashingManager {
    config: SlashingConfig,
    validators: Arc<ValidatorSetManager>,
    tombstones: Arc<TombstoneRegistry>,
    time: Arc<dyn TimeSource>,
    ledger: Mutex<SlashLedger>,
}

impl SlashingManager {
    pub fn new(
        config: SlashingConfig,
        validators: Arc<ValidatorSetManager>,
        tombstones: Arc<TombstoneRegistry>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            validators,
            tombstones,
            time,
            ledger: Mutex::new(SlashLedger::default()),
        }
    }

    /// Apply the penalty for `misbehavior` and tombstone at the threshold.
    pub fn slash(
        &self,
        validator: Address,
        misbehavior: MisbehaviorType,
        height: u64,
    ) -> FinalityResult<SlashingRecord> {
        // Held across the read-modify-write of the stake.
        let mut ledger = self.ledger.lock();

        if self.tombstones.is_tombstoned(&validator) {
            return Err(FinalityError::Tombstoned { validator });
        }
        let stake_before = self
            .validators
            .stake_of(&validator)
            .ok_or(FinalityError::UnknownValidator { validator })?;
        let penalty = misbehavior.penalty_on(stake_before);
        let stake_after = stake_before - penalty;
        self.validators.update_stake(&validator, stake_after)?;

        let count = ledger.counts.entry(validator).or_insert(0);
        *count += 1;
        let slashed_count = *count;
        let at = self.time.now();

        let tombstoned = slashed_count >= self.config.tombstone_threshold;
        if tombstoned {
            self.tombstones.tombstone(validator, misbehavior, at);
            self.validators.remove(&validator);
            tracing::warn!(
                "[lc-09] validator {} tombstoned after {} slashes",
                short_hex(&validator),
                slashed_count
            );
        }

        ledger_telemetry::metrics::record_slashing(misbehavior.label());
        tracing::warn!(
            "[lc-09] slashed {} for {:?} at height {}: {} -> {}",
            short_hex(&validator),
            misbehavior,
            height,
            stake_before,
            stake_after
        );

        let record = SlashingRecord {
            validator,
            misbehavior,
            height,
            stake_before,
            penalty,
            stake_after,
            slashed_count,
            tombstoned,
            at,
        };
        ledger.records.push(record.clone());
        Ok(record)
    }

    pub fn slashed_count(&self, validator: &Address) -> u32 {
        self.ledger.lock().counts.get(validator).copied().unwrap_or(0)
    }

    pub fn total_slashings(&self) -> usize {
        self.ledger.lock().records.len()
    }

    pub fn records_for(&self, validator: &Address) -> Vec<SlashingRecord> {
        self.ledger
            .lock()
            .records
            .iter()
            .filter(|r| r.validator == *validator)
            .cloned()
            .collect()
    }

    pub fn is_tombstoned(&self, validator: &Address) -> bool {
        self.tombstones.is_tombstoned(validator)
    }
}

impl SlashingHandler for SlashingManager {
    fn on_double_sign(&self, proof: &DoubleSignProof) -> Option<SlashingRecord> {
        match self.slash(proof.validator, MisbehaviorType::DoubleSigning, proof.height) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    "[lc-09] double sign by {} not slashed: {}",
                    short_hex(&proof.validator),
                    e
                );
                None
            }
        }
    }
}
