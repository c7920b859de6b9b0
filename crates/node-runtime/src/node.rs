//! # Node
//!
//! Wires one chain manager to its finality overlay:
//!
//! ```text
//! ValidatorSetManager ──rotate──→ FinalityManager ←──votes── Node
//!        ↑                              │
//!        └──── SlashingManager ←─double sign
//!                                       │
//!                                 finality veto
//!                                       ↓
//!                                 ChainManager
//! ```
//!
//! The node votes with its own key for every new tip it sees, at most once
//! per height, so it can never sign two blocks at one height.

use crate::broadcaster::LoggingBroadcaster;
use crate::config::NodeConfig;
use crate::error::NodeResult;
use lc_02_block_storage::{ChainStore, FileBlobStore};
use lc_08_consensus::{ChainDependencies, ChainManager, ChainResult};
use lc_09_finality::{
    sign_vote, FinalityManager, SlashingManager, TombstoneRegistry, ValidatorIdentity,
    ValidatorSetManager, VoteOutcome,
};
use parking_lot::Mutex;
use shared_crypto::Ed25519KeyPair;
use shared_types::{short_hex, Address, Block, SystemTimeSource, TimeSource};
use std::collections::HashSet;
use std::sync::Arc;

pub struct Node {
    config: NodeConfig,
    identity: Ed25519KeyPair,
    miner_address: Address,
    chain: Arc<ChainManager>,
    finality: Arc<FinalityManager>,
    slashing: Arc<SlashingManager>,
    validators: Arc<ValidatorSetManager>,
    broadcaster: Arc<LoggingBroadcaster>,
    /// Highest height this node has voted at.
    last_vote: Mutex<Option<u64>>,
    /// Height at which the validator set was last rotated.
    last_rotation: Mutex<u64>,
}

impl Node {
    /// Open the node on the file store under `config.data_dir`.
    pub fn open(config: NodeConfig) -> NodeResult<Self> {
        let store = ChainStore::new(Arc::new(FileBlobStore::open(&config.data_dir)?));
        Self::with_store(config, store, Arc::new(SystemTimeSource))
    }

    pub fn with_store(
        config: NodeConfig,
        store: ChainStore,
        time: Arc<dyn TimeSource>,
    ) -> NodeResult<Self> {
        config.validate()?;
        let identity = match config.miner_seed {
            Some(seed) => Ed25519KeyPair::from_seed(seed),
            None => Ed25519KeyPair::generate(),
        };
        let miner_address = config.miner_address.unwrap_or_else(|| identity.address());

        let tombstones = Arc::new(TombstoneRegistry::new());
        let validators = Arc::new(ValidatorSetManager::new(
            config.validator_set.clone(),
            Arc::clone(&tombstones),
        ));
        let own = *identity.public_key().as_bytes();
        for public_key in std::iter::once(own).chain(config.validator_keys.iter().copied()) {
            let candidate = ValidatorIdentity::new(public_key, config.validator_stake);
            validators.register(candidate, config.validator_stake)?;
        }
        let active = validators.rotate_validator_set()?;

        let slashing = Arc::new(SlashingManager::new(
            config.slashing.clone(),
            Arc::clone(&validators),
            tombstones,
            Arc::clone(&time),
        ));
        let finality = Arc::new(FinalityManager::open(
            config.finality.clone(),
            active,
            store.clone(),
            slashing.clone(),
            Arc::clone(&time),
        )?);

        let broadcaster = Arc::new(LoggingBroadcaster::new());
        let deps = ChainDependencies::new(store, time)
            .with_finality(Arc::clone(&finality))
            .with_broadcaster(broadcaster.clone());
        let chain = Arc::new(ChainManager::open(config.chain.clone(), deps)?);
        let height = chain.height();

        tracing::info!(
            "[node] opened at height {} as {} (miner {})",
            height,
            short_hex(&identity.address()),
            short_hex(&miner_address)
        );

        Ok(Self {
            last_rotation: Mutex::new(height),
            last_vote: Mutex::new(finality.get_highest_finalized_height()),
            config,
            identity,
            miner_address,
            chain,
            finality,
            slashing,
            validators,
            broadcaster,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.identity.address()
    }

    pub fn chain(&self) -> &Arc<ChainManager> {
        &self.chain
    }

    pub fn finality(&self) -> &Arc<FinalityManager> {
        &self.finality
    }

    pub fn slashing(&self) -> &Arc<SlashingManager> {
        &self.slashing
    }

    pub fn validators(&self) -> &Arc<ValidatorSetManager> {
        &self.validators
    }

    pub fn broadcaster(&self) -> &Arc<LoggingBroadcaster> {
        &self.broadcaster
    }

    /// Mine one block, then vote for it and rotate if an epoch ended.
    pub fn mine_once(&self) -> ChainResult<Block> {
        let block = self
            .chain
            .mine_pending_transactions(self.miner_address, Some(&self.identity))?;
        self.on_new_tip();
        Ok(block)
    }

    /// Vote for the current tip and rotate validators at epoch boundaries.
    pub fn on_new_tip(&self) {
        if let Some(block) = self.chain.block_at(self.chain.height()) {
            self.vote_for(&block);
        }
        self.maybe_rotate();
    }

    /// Sign a finality vote for `block` unless this node already voted at
    /// that height or is not in the active set.
    pub fn vote_for(&self, block: &Block) -> Option<VoteOutcome> {
        let height = block.index();
        if !self.finality.is_validator(&self.address()) {
            return None;
        }
        {
            let mut last = self.last_vote.lock();
            if last.is_some_and(|h| h >= height) {
                return None;
            }
            *last = Some(height);
        }

        let signature = sign_vote(&self.identity, &block.header);
        match self
            .finality
            .record_vote(&self.address(), &block.header, &signature)
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("[node] vote for block {} rejected: {}", height, e);
                None
            }
        }
    }

    fn maybe_rotate(&self) {
        let height = self.chain.height();
        let mut last = self.last_rotation.lock();
        if height < *last + self.config.epoch_blocks {
            return;
        }
        *last = height;

        let active = match self.validators.rotate_validator_set() {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!("[node] validator rotation at height {} failed: {}", height, e);
                return;
            }
        };
        let keep: HashSet<Address> = active.iter().map(|v| v.address).collect();
        for current in self.finality.validators() {
            if !keep.contains(&current.address) {
                self.finality.remove_validator(&current.address);
            }
        }
        for identity in active {
            if !self.finality.is_validator(&identity.address) {
                self.finality.add_validator(identity);
            }
        }
    }
}
