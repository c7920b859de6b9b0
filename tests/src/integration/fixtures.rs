//! Shared setup for the integration flows.
//!
//! Every chain built here shares one genesis: alice owns three outputs of
//! 2.0 each, at `genesis_outpoint(0..3)`.

use lc_02_block_storage::{ChainStore, MemoryBlobStore};
use lc_08_consensus::{build_genesis, ChainConfig, ChainDependencies, ChainManager};
use lc_09_finality::{
    FinalityConfig, FinalityManager, SlashingConfig, SlashingManager, TombstoneRegistry,
    ValidatorIdentity, ValidatorSetConfig, ValidatorSetManager,
};
use node_runtime::{Node, NodeConfig};
use shared_crypto::{sign_transaction, Ed25519KeyPair};
use shared_types::{
    Address, Amount, ManualTimeSource, OutPoint, Transaction, TxOutput, COIN, ZERO_HASH,
};
use std::sync::Arc;

pub const GENESIS_OUTPUT: Amount = 2 * COIN;
pub const START_TIME: u64 = 50_000;
pub const VALIDATOR_STAKE: Amount = 1_000;

pub fn alice() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([1; 32])
}

pub fn key(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

pub fn clock() -> Arc<ManualTimeSource> {
    Arc::new(ManualTimeSource::new(START_TIME))
}

pub fn memory_store() -> ChainStore {
    ChainStore::new(Arc::new(MemoryBlobStore::new()))
}

pub fn chain_config() -> ChainConfig {
    let owner = alice().address();
    ChainConfig::for_testing()
        .with_allocation(owner, GENESIS_OUTPUT)
        .with_allocation(owner, GENESIS_OUTPUT)
        .with_allocation(owner, GENESIS_OUTPUT)
}

pub fn genesis_outpoint(vout: u32) -> OutPoint {
    let genesis = build_genesis(&chain_config().genesis);
    OutPoint::new(genesis.transactions[0].txid, vout)
}

/// Spend one genesis output of alice: `amount` to `to`, change back to alice.
pub fn transfer(vout: u32, to: Address, amount: Amount, fee: Amount, nonce: u64) -> Transaction {
    let keys = alice();
    let mut tx = Transaction {
        sender: keys.address(),
        recipient: to,
        amount,
        fee,
        nonce,
        inputs: vec![genesis_outpoint(vout)],
        outputs: vec![
            TxOutput::new(amount, to),
            TxOutput::new(GENESIS_OUTPUT - amount - fee, keys.address()),
        ],
        signature: [0; 64],
        public_key: [0; 32],
        timestamp: START_TIME,
        txid: ZERO_HASH,
    };
    sign_transaction(&mut tx, &keys);
    tx
}

pub fn chain(store: ChainStore, time: Arc<ManualTimeSource>) -> ChainManager {
    ChainManager::open(chain_config(), ChainDependencies::new(store, time)).unwrap()
}

pub fn chain_with_finality(
    store: ChainStore,
    time: Arc<ManualTimeSource>,
    finality: Arc<FinalityManager>,
) -> ChainManager {
    let deps = ChainDependencies::new(store, time).with_finality(finality);
    ChainManager::open(chain_config(), deps).unwrap()
}

/// Config for a node whose validator set is every key in `validator_seeds`.
pub fn node_config(seed: u8, validator_seeds: &[u8]) -> NodeConfig {
    let mut config = NodeConfig {
        miner_seed: Some([seed; 32]),
        chain: chain_config(),
        ..NodeConfig::for_testing()
    };
    config.validator_keys = validator_seeds
        .iter()
        .filter(|s| **s != seed)
        .map(|s| *key(*s).public_key().as_bytes())
        .collect();
    config.validator_set.set_size = config.validator_keys.len() + 1;
    config
}

pub fn open_node(config: NodeConfig, time: Arc<ManualTimeSource>) -> Arc<Node> {
    Arc::new(Node::with_store(config, memory_store(), time).unwrap())
}

/// A lone node: its own single validator, so it finalizes what it mines.
pub fn node(seed: u8, time: Arc<ManualTimeSource>) -> Arc<Node> {
    open_node(node_config(seed, &[seed]), time)
}

/// Nodes sharing one validator set. Votes are not gossiped, so no node
/// reaches quorum alone and fork choice falls back to length.
pub fn network(seeds: &[u8], time: Arc<ManualTimeSource>) -> Vec<Arc<Node>> {
    seeds
        .iter()
        .map(|seed| open_node(node_config(*seed, seeds), time.clone()))
        .collect()
}

/// Validators with equal stake and voting power, plus the slashing stack
/// behind them.
pub struct Validators {
    pub keys: Vec<Ed25519KeyPair>,
    pub set: Arc<ValidatorSetManager>,
    pub slashing: Arc<SlashingManager>,
}

impl Validators {
    pub fn new(seeds: std::ops::RangeInclusive<u8>, time: Arc<ManualTimeSource>) -> Self {
        let keys: Vec<Ed25519KeyPair> = seeds.map(key).collect();
        let tombstones = Arc::new(TombstoneRegistry::new());
        let set = Arc::new(ValidatorSetManager::new(
            ValidatorSetConfig {
                set_size: keys.len(),
            },
            tombstones.clone(),
        ));
        for identity in Self::identities_of(&keys) {
            set.register(identity, VALIDATOR_STAKE).unwrap();
        }
        let slashing = Arc::new(SlashingManager::new(
            SlashingConfig::for_testing(),
            set.clone(),
            tombstones,
            time,
        ));
        Self {
            keys,
            set,
            slashing,
        }
    }

    fn identities_of(keys: &[Ed25519KeyPair]) -> Vec<ValidatorIdentity> {
        keys.iter()
            .map(|k| ValidatorIdentity::new(*k.public_key().as_bytes(), 10))
            .collect()
    }

    pub fn identities(&self) -> Vec<ValidatorIdentity> {
        Self::identities_of(&self.keys)
    }

    pub fn finality(&self, store: ChainStore, time: Arc<ManualTimeSource>) -> Arc<FinalityManager> {
        Arc::new(
            FinalityManager::open(
                FinalityConfig::for_testing(),
                self.identities(),
                store,
                self.slashing.clone(),
                time,
            )
            .unwrap(),
        )
    }
}
