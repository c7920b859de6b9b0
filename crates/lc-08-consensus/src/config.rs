//! Chain configuration.

use lc_06_mempool::MempoolConfig;
use lc_17_block_production::BlockProductionConfig;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Address, Amount, Timestamp};

/// One genesis output.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    #[serde_as(as = "Hex")]
    pub address: Address,
    pub amount: Amount,
}

/// Every node with the same genesis config builds the same genesis block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub timestamp: Timestamp,
    pub allocations: Vec<GenesisAllocation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub genesis: GenesisConfig,
    /// Write a checkpoint every this many blocks.
    pub checkpoint_interval: u64,
    /// Block timestamps may run ahead of the local clock by at most this much.
    pub max_future_drift_ms: u64,
    /// Per-peer budget for the chain-info query during sync.
    pub peer_timeout_ms: u64,
    /// Per-peer budget for downloading a full chain.
    pub fetch_timeout_ms: u64,
    /// Block deltas kept for reorgs before falling back to a rebuild.
    pub delta_retention: usize,
    pub mempool: MempoolConfig,
    pub production: BlockProductionConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis: GenesisConfig::default(),
            checkpoint_interval: 100,
            max_future_drift_ms: 2 * 60 * 60 * 1000,
            peer_timeout_ms: 2_000,
            fetch_timeout_ms: 10_000,
            delta_retention: lc_04_state_management::DEFAULT_DELTA_RETENTION,
            mempool: MempoolConfig::default(),
            production: BlockProductionConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn for_testing() -> Self {
        Self {
            checkpoint_interval: 5,
            peer_timeout_ms: 200,
            fetch_timeout_ms: 1_000,
            delta_retention: 64,
            mempool: MempoolConfig::for_testing(),
            production: BlockProductionConfig::for_testing(),
            ..Self::default()
        }
    }

    pub fn with_allocation(mut self, address: Address, amount: Amount) -> Self {
        self.genesis
            .allocations
            .push(GenesisAllocation { address, amount });
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.checkpoint_interval == 0 {
            return Err("checkpoint_interval must be positive".into());
        }
        if self.peer_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err("peer timeouts must be positive".into());
        }
        if self.genesis.allocations.iter().any(|a| a.amount == 0) {
            return Err("genesis allocations must be positive".into());
        }
        self.production.validate()
    }
}
