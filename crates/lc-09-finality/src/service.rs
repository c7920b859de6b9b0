//! # Finality Manager
//!
//! Vote intake and certificate issuance. The tally table, the double-sign
//! detector and the certificate index share one mutex, so concurrent votes
//! never double-count a validator or race past the quorum check.
//!
//! ## Vote Pipeline
//!
//! 1. Look up the voter and verify its signature over the vote payload
//! 2. Run the double-sign detector; a conflict slashes and drops the vote
//! 3. Reject votes against an already finalized height with another hash
//! 4. Accumulate power; crossing the quorum issues a certificate and
//!    persists it before the in-memory state moves

use crate::config::FinalityConfig;
use crate::domain::{
    build_vote_payload, exceeds_quorum, DoubleSignDetector, FinalityCertificate,
    SlashingHandler, TallyState, ValidatorIdentity, VoteTally,
};
use crate::error::{FinalityError, FinalityResult};
use lc_02_block_storage::{keys, ChainStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_crypto::verify_raw;
use shared_types::{
    short_hex, Address, BlockHeader, Hash, Signature, StorageError, TimeSource,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Result of an accepted vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Power added; quorum not reached yet.
    Counted { power: u64, total_power: u64 },
    /// This validator was already counted for the tally.
    AlreadyCounted,
    /// This vote crossed the quorum.
    Finalized(FinalityCertificate),
    /// The block was already finalized.
    AlreadyFinalized,
    /// The height lies below the highest finalized height; not tallied.
    Stale,
}

impl VoteOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Counted { .. } => "counted",
            Self::AlreadyCounted => "duplicate",
            Self::Finalized(_) => "finalized",
            Self::AlreadyFinalized => "already_finalized",
            Self::Stale => "stale",
        }
    }
}

fn error_label(error: &FinalityError) -> &'static str {
    match error {
        FinalityError::InvalidSignature { .. } => "invalid_signature",
        FinalityError::UnknownValidator { .. } => "unknown_validator",
        FinalityError::DoubleSign { .. } => "double_sign",
        FinalityError::ConflictsWithFinalized { .. } => "conflict",
        _ => "error",
    }
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedFinalityState {
    highest_finalized_height: Option<u64>,
    #[serde_as(as = "Option<Hex>")]
    highest_finalized_hash: Option<Hash>,
}

#[derive(Default)]
struct FinalityState {
    validators: BTreeMap<Address, ValidatorIdentity>,
    detector: DoubleSignDetector,
    tallies: HashMap<(u64, Hash), VoteTally>,
    certificates: BTreeMap<u64, FinalityCertificate>,
    by_hash: HashMap<Hash, u64>,
    highest: Option<u64>,
}

impl FinalityState {
    fn total_power(&self) -> u64 {
        self.validators
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(v.voting_power))
    }
}

pub struct FinalityManager {
    config: FinalityConfig,
    store: ChainStore,
    slashing: Arc<dyn SlashingHandler>,
    time: Arc<dyn TimeSource>,
    state: Mutex<FinalityState>,
}

impl FinalityManager {
    /// Build the manager and reload any persisted certificates.
    pub fn open(
        config: FinalityConfig,
        validators: Vec<ValidatorIdentity>,
        store: ChainStore,
        slashing: Arc<dyn SlashingHandler>,
        time: Arc<dyn TimeSource>,
    ) -> FinalityResult<Self> {
        config.validate().map_err(FinalityError::InvalidConfig)?;

        let (certificates, highest) = load_persisted(&store)?;
        let by_hash = certificates
            .values()
            .map(|c| (c.block_hash, c.height))
            .collect();
        if let Some(height) = highest {
            tracing::info!(
                "[lc-09] reloaded {} certificates, finalized through height {}",
                certificates.len(),
                height
            );
            ledger_telemetry::metrics::set_finalized_height(height);
        }

        let state = FinalityState {
            validators: validators.into_iter().map(|v| (v.address, v)).collect(),
            certificates,
            by_hash,
            highest,
            ..FinalityState::default()
        };
        Ok(Self {
            config,
            store,
            slashing,
            time,
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &FinalityConfig {
        &self.config
    }

    // =========================================================================
    // VOTING
    // =========================================================================

    /// Count `validator`'s signed vote for `header`.
    pub fn record_vote(
        &self,
        validator: &Address,
        header: &BlockHeader,
        signature: &Signature,
    ) -> FinalityResult<VoteOutcome> {
        let result = self.tally_vote(validator, header, signature);
        match &result {
            Ok(outcome) => ledger_telemetry::metrics::record_vote(outcome.label()),
            Err(e) => {
                tracing::debug!(
                    "[lc-09] vote from {} for height {} rejected: {}",
                    short_hex(validator),
                    header.index,
                    e
                );
                ledger_telemetry::metrics::record_vote(error_label(e));
            }
        }
        result
    }

    fn tally_vote(
        &self,
        validator: &Address,
        header: &BlockHeader,
        signature: &Signature,
    ) -> FinalityResult<VoteOutcome> {
        let mut state = self.state.lock();

        let identity = state
            .validators
            .get(validator)
            .cloned()
            .ok_or(FinalityError::UnknownValidator {
                validator: *validator,
            })?;
        verify_raw(&identity.public_key, &build_vote_payload(header), signature).map_err(
            |_| FinalityError::InvalidSignature {
                validator: *validator,
            },
        )?;

        let (height, block_hash) = (header.index, header.hash);
        let now = self.time.now();
        let (double_signed, proof) =
            state
                .detector
                .process_signed_block(*validator, height, block_hash, now);
        if double_signed {
            if let Some(proof) = proof {
                tracing::warn!(
                    "[lc-09] double sign by {} at height {}: {} vs {}",
                    short_hex(validator),
                    height,
                    short_hex(&proof.first_hash),
                    short_hex(&proof.second_hash)
                );
                if let Some(record) = self.slashing.on_double_sign(&proof) {
                    if record.tombstoned {
                        state.validators.remove(validator);
                        tracing::warn!(
                            "[lc-09] removed tombstoned voter {}",
                            short_hex(validator)
                        );
                    }
                }
            }
            return Err(FinalityError::DoubleSign {
                validator: *validator,
                height,
            });
        }

        if let Some(certificate) = state.certificates.get(&height) {
            if certificate.block_hash != block_hash {
                return Err(FinalityError::ConflictsWithFinalized {
                    height,
                    finalized: certificate.block_hash,
                });
            }
            return Ok(VoteOutcome::AlreadyFinalized);
        }
        if state.highest.is_some_and(|top| height < top) {
            return Ok(VoteOutcome::Stale);
        }

        let total_power = state.total_power();
        let tally = state.tallies.entry((height, block_hash)).or_default();
        if !tally.add(*validator, identity.voting_power) {
            return Ok(VoteOutcome::AlreadyCounted);
        }
        let power = tally.power();
        if !exceeds_quorum(
            power,
            total_power,
            self.config.quorum_numerator,
            self.config.quorum_denominator,
        ) {
            return Ok(VoteOutcome::Counted { power, total_power });
        }

        let certificate = FinalityCertificate {
            height,
            block_hash,
            voters: tally.voters().copied().collect(),
            voting_power: power,
            total_power,
            created_at: now,
        };
        self.commit(&mut state, certificate.clone())?;
        Ok(VoteOutcome::Finalized(certificate))
    }

    /// Persist `certificate`, then install it. New certificates are always
    /// above the current highest height.
    fn commit(&self, state: &mut FinalityState, certificate: FinalityCertificate) -> FinalityResult<()> {
        let mut all: Vec<&FinalityCertificate> = state.certificates.values().collect();
        all.push(&certificate);
        self.store.put_json(keys::FINALITY_CERTIFICATES, &all)?;
        self.store.put_json(
            keys::FINALITY_STATE,
            &PersistedFinalityState {
                highest_finalized_height: Some(certificate.height),
                highest_finalized_hash: Some(certificate.block_hash),
            },
        )?;

        let height = certificate.height;
        tracing::info!(
            "[lc-09] finalized block {} at height {} with {}/{} power",
            short_hex(&certificate.block_hash),
            height,
            certificate.voting_power,
            certificate.total_power
        );
        state.by_hash.insert(certificate.block_hash, height);
        state.certificates.insert(height, certificate);
        state.highest = Some(height);
        state.tallies.retain(|(h, _), _| *h > height);
        state
            .detector
            .prune_below(height.saturating_sub(self.config.double_sign_retention));
        ledger_telemetry::metrics::set_finalized_height(height);
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn is_block_finalized(&self, block_hash: &Hash) -> bool {
        self.state.lock().by_hash.contains_key(block_hash)
    }

    /// True for every height at or below the highest finalized one.
    pub fn is_height_finalized(&self, height: u64) -> bool {
        self.state.lock().highest.is_some_and(|top| height <= top)
    }

    pub fn get_highest_finalized_height(&self) -> Option<u64> {
        self.state.lock().highest
    }

    /// Height and hash of the newest certificate.
    pub fn highest_finalized(&self) -> Option<(u64, Hash)> {
        let state = self.state.lock();
        let height = state.highest?;
        state
            .certificates
            .get(&height)
            .map(|c| (height, c.block_hash))
    }

    pub fn get_finality_certificate(&self, block_hash: &Hash) -> Option<FinalityCertificate> {
        let state = self.state.lock();
        let height = state.by_hash.get(block_hash)?;
        state.certificates.get(height).cloned()
    }

    /// Hash certified at exactly `height`.
    pub fn finalized_hash_at(&self, height: u64) -> Option<Hash> {
        self.state
            .lock()
            .certificates
            .get(&height)
            .map(|c| c.block_hash)
    }

    pub fn certificates(&self) -> Vec<FinalityCertificate> {
        self.state.lock().certificates.values().cloned().collect()
    }

    pub fn tally_state(&self, height: u64, block_hash: &Hash) -> TallyState {
        let state = self.state.lock();
        if state.by_hash.get(block_hash) == Some(&height) {
            return TallyState::Finalized;
        }
        match state.tallies.get(&(height, *block_hash)) {
            Some(tally) if tally.voter_count() > 0 => TallyState::PartialQuorum,
            _ => TallyState::NoVotes,
        }
    }

    pub fn pending_tallies(&self) -> usize {
        self.state.lock().tallies.len()
    }

    // =========================================================================
    // VOTER REGISTRY
    // =========================================================================

    pub fn validators(&self) -> Vec<ValidatorIdentity> {
        self.state.lock().validators.values().cloned().collect()
    }

    pub fn is_validator(&self, address: &Address) -> bool {
        self.state.lock().validators.contains_key(address)
    }

    pub fn add_validator(&self, identity: ValidatorIdentity) {
        self.state.lock().validators.insert(identity.address, identity);
    }

    pub fn remove_validator(&self, address: &Address) -> Option<ValidatorIdentity> {
        self.state.lock().validators.remove(address)
    }

    pub fn total_voting_power(&self) -> u64 {
        self.state.lock().total_power()
    }
}

fn corrupted(key: &str, reason: String) -> FinalityError {
    FinalityError::Storage(StorageError::Corrupted {
        key: key.to_string(),
        reason,
    })
}

/// Load certificates and the highest finalized height, checking they agree.
///
/// Certificates are written before the state blob, so certificates ahead of
/// the state are a torn write and win. A state pointing at a missing or
/// different certificate is corruption.
fn load_persisted(
    store: &ChainStore,
) -> FinalityResult<(BTreeMap<u64, FinalityCertificate>, Option<u64>)> {
    let stored: Vec<FinalityCertificate> = store
        .get_json(keys::FINALITY_CERTIFICATES)?
        .unwrap_or_default();
    let persisted: PersistedFinalityState =
        store.get_json(keys::FINALITY_STATE)?.unwrap_or_default();

    let mut certificates = BTreeMap::new();
    for certificate in stored {
        let height = certificate.height;
        if certificates.insert(height, certificate).is_some() {
            return Err(corrupted(
                keys::FINALITY_CERTIFICATES,
                format!("two certificates at height {height}"),
            ));
        }
    }
    let top = certificates.keys().next_back().copied();

    match (persisted.highest_finalized_height, persisted.highest_finalized_hash) {
        (None, _) => {
            if let Some(top) = top {
                tracing::warn!(
                    "[lc-09] finality state missing; recovering height {} from certificates",
                    top
                );
            }
        }
        (Some(height), hash) => {
            let certificate = certificates.get(&height).ok_or_else(|| {
                corrupted(
                    keys::FINALITY_STATE,
                    format!("no certificate for finalized height {height}"),
                )
            })?;
            if hash != Some(certificate.block_hash) {
                return Err(corrupted(
                    keys::FINALITY_STATE,
                    format!("finalized hash at height {height} disagrees with certificate"),
                ));
            }
            if top > Some(height) {
                tracing::warn!(
                    "[lc-09] finality state at {} behind certificates; using {:?}",
                    height,
                    top
                );
            }
        }
    }
    Ok((certificates, top))
}
