//! Finality, slashing and validator-set configuration.

use serde::{Deserialize, Serialize};

/// Quorum and retention settings for the vote tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalityConfig {
    /// Finalize once accumulated power exceeds `numerator / denominator` of the total.
    pub quorum_numerator: u64,
    pub quorum_denominator: u64,
    /// Heights of double-sign records kept below the highest finalized height.
    pub double_sign_retention: u64,
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            quorum_numerator: 2,
            quorum_denominator: 3,
            double_sign_retention: 10_000,
        }
    }
}

impl FinalityConfig {
    pub fn for_testing() -> Self {
        Self {
            double_sign_retention: 16,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.quorum_denominator == 0 {
            return Err("quorum_denominator must be positive".into());
        }
        if self.quorum_numerator == 0 || self.quorum_numerator >= self.quorum_denominator {
            return Err(format!(
                "quorum {}/{} must lie strictly between 0 and 1",
                self.quorum_numerator, self.quorum_denominator
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingConfig {
    /// Slashes after which a validator is tombstoned.
    pub tombstone_threshold: u32,
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self {
            tombstone_threshold: 3,
        }
    }
}

impl SlashingConfig {
    pub fn for_testing() -> Self {
        Self {
            tombstone_threshold: 2,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tombstone_threshold == 0 {
            return Err("tombstone_threshold must be positive".into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSetConfig {
    /// Validators drawn per rotation.
    pub set_size: usize,
}

impl Default for ValidatorSetConfig {
    fn default() -> Self {
        Self { set_size: 4 }
    }
}

impl ValidatorSetConfig {
    pub fn for_testing() -> Self {
        Self { set_size: 3 }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.set_size == 0 {
            return Err("set_size must be positive".into());
        }
        Ok(())
    }
}
