//! # Validator Set Rotation
//!
//! Stake-weighted sampling without replacement. Weight is
//! `stake * reputation`; eligibility requires positive stake and no tombstone.
//!
//! The RNG is injected so tests can replay a rotation from a seed; the
//! production entry point draws from `OsRng`.

use super::tombstone::TombstoneRegistry;
use super::validator::ValidatorIdentity;
use crate::config::ValidatorSetConfig;
use crate::error::{FinalityError, FinalityResult};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use shared_types::{short_hex, Address, Amount};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorCandidate {
    pub identity: ValidatorIdentity,
    pub stake: Amount,
}

impl ValidatorCandidate {
    fn weight(&self) -> u128 {
        self.stake as u128 * self.identity.reputation as u128
    }
}

#[derive(Debug, Default)]
struct SetState {
    /// Ordered by address so a seeded rotation is reproducible.
    candidates: BTreeMap<Address, ValidatorCandidate>,
    active: Vec<ValidatorIdentity>,
    epoch: u64,
}

#[derive(Debug)]
pub struct ValidatorSetManager {
    config: ValidatorSetConfig,
    tombstones: Arc<TombstoneRegistry>,
    state: RwLock<SetState>,
}

impl ValidatorSetManager {
    pub fn new(config: ValidatorSetConfig, tombstones: Arc<TombstoneRegistry>) -> Self {
        Self {
            config,
            tombstones,
            state: RwLock::new(SetState::default()),
        }
    }

    pub fn config(&self) -> &ValidatorSetConfig {
        &self.config
    }

    /// Add or replace a candidate. Tombstoned addresses cannot come back.
    pub fn register(&self, identity: ValidatorIdentity, stake: Amount) -> FinalityResult<()> {
        if self.tombstones.is_tombstoned(&identity.address) {
            return Err(FinalityError::Tombstoned {
                validator: identity.address,
            });
        }
        tracing::debug!(
            "[lc-09] registered candidate {} with stake {}",
            short_hex(&identity.address),
            stake
        );
        self.state
            .write()
            .candidates
            .insert(identity.address, ValidatorCandidate { identity, stake });
        Ok(())
    }

    pub fn update_stake(&self, validator: &Address, stake: Amount) -> FinalityResult<()> {
        let mut state = self.state.write();
        let candidate = state
            .candidates
            .get_mut(validator)
            .ok_or(FinalityError::UnknownValidator {
                validator: *validator,
            })?;
        candidate.stake = stake;
        Ok(())
    }

    pub fn stake_of(&self, validator: &Address) -> Option<Amount> {
        self.state.read().candidates.get(validator).map(|c| c.stake)
    }

    /// Drop a candidate and take it out of the active set.
    pub fn remove(&self, validator: &Address) -> Option<ValidatorCandidate> {
        let mut state = self.state.write();
        state.active.retain(|v| v.address != *validator);
        state.candidates.remove(validator)
    }

    pub fn candidate(&self, validator: &Address) -> Option<ValidatorCandidate> {
        self.state.read().candidates.get(validator).cloned()
    }

    pub fn candidate_count(&self) -> usize {
        self.state.read().candidates.len()
    }

    pub fn active_set(&self) -> Vec<ValidatorIdentity> {
        self.state.read().active.clone()
    }

    pub fn current_epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Rotate using the operating system CSPRNG.
    pub fn rotate_validator_set(&self) -> FinalityResult<Vec<ValidatorIdentity>> {
        self.rotate_validator_set_with(&mut OsRng)
    }

    /// Draw `set_size` distinct validators, each with probability
    /// proportional to its weight among those not yet drawn.
    ///
    /// Fails when fewer than `set_size` candidates are eligible. When the
    /// remaining weight runs out early the smaller set is installed.
    pub fn rotate_validator_set_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> FinalityResult<Vec<ValidatorIdentity>> {
        let mut state = self.state.write();
        let required = self.config.set_size;

        let mut pool: Vec<&ValidatorCandidate> = state
            .candidates
            .values()
            .filter(|c| c.stake > 0 && !self.tombstones.is_tombstoned(&c.identity.address))
            .collect();
        if pool.len() < required {
            return Err(FinalityError::InsufficientValidators {
                eligible: pool.len(),
                required,
            });
        }

        let mut selected = Vec::with_capacity(required);
        while selected.len() < required {
            let total: u128 = pool.iter().map(|c| c.weight()).sum();
            if total == 0 {
                tracing::warn!(
                    "[lc-09] rotation drew {} of {} validators; remaining weight is zero",
                    selected.len(),
                    required
                );
                break;
            }
            let mut ticket = rng.gen_range(0..total);
            let mut pick = pool.len() - 1;
            for (i, candidate) in pool.iter().enumerate() {
                let weight = candidate.weight();
                if ticket < weight {
                    pick = i;
                    break;
                }
                ticket -= weight;
            }
            selected.push(pool.swap_remove(pick).identity.clone());
        }

        state.epoch += 1;
        state.active = selected.clone();
        tracing::info!(
            "[lc-09] epoch {} validator set: {} members",
            state.epoch,
            selected.len()
        );
        Ok(selected)
    }
}
