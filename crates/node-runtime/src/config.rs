//! # Node Configuration
//!
//! Every subsystem config plus runtime parameters, assembled from `LC_*`
//! environment variables on top of the defaults.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LC_DATA_DIR` | `data_dir` |
//! | `LC_MINER_SEED` | `miner_seed` (64 hex chars) |
//! | `LC_MINER_ADDRESS` | `miner_address` (40 hex chars) |
//! | `LC_MINING` | `mining_enabled` |
//! | `LC_MINING_INTERVAL_MS` | `mining_interval_ms` |
//! | `LC_SYNC_INTERVAL_MS` | `sync_interval_ms` |
//! | `LC_EPOCH_BLOCKS` | `epoch_blocks` |
//! | `LC_VALIDATOR_KEYS` | `validator_keys` (comma-separated hex public keys) |
//! | `LC_VALIDATOR_STAKE` | `validator_stake` |
//! | `LC_VALIDATOR_SET_SIZE` | `validator_set.set_size` |
//! | `LC_TOMBSTONE_THRESHOLD` | `slashing.tombstone_threshold` |
//! | `LC_QUORUM_NUM` / `LC_QUORUM_DEN` | `finality.quorum_numerator` / `quorum_denominator` |
//! | `LC_GENESIS_FILE` | `chain.genesis` (JSON) |
//! | `LC_DIFFICULTY` | `chain.production.difficulty` |
//! | `LC_MINING_BACKOFF_MS` | `chain.production.mining_backoff_ms` |
//! | `LC_CHECKPOINT_INTERVAL` | `chain.checkpoint_interval` |
//! | `LC_PEER_TIMEOUT_MS` | `chain.peer_timeout_ms` |

use lc_08_consensus::{ChainConfig, GenesisConfig};
use lc_09_finality::{FinalityConfig, SlashingConfig, ValidatorSetConfig};
use shared_types::{Address, Amount, PublicKey};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot load genesis from {path}: {reason}")]
    Genesis { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    /// Seed of the node's block-signing and voting key. Random when unset.
    pub miner_seed: Option<[u8; 32]>,
    /// Coinbase recipient. Defaults to the identity's address.
    pub miner_address: Option<Address>,
    pub mining_enabled: bool,
    /// Pause between successful blocks.
    pub mining_interval_ms: u64,
    pub sync_interval_ms: u64,
    /// Rotate the validator set every this many blocks.
    pub epoch_blocks: u64,
    /// Other validator candidates, besides the node itself.
    pub validator_keys: Vec<PublicKey>,
    /// Stake registered for every configured validator.
    pub validator_stake: Amount,
    pub chain: ChainConfig,
    pub finality: FinalityConfig,
    pub slashing: SlashingConfig,
    pub validator_set: ValidatorSetConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            miner_seed: None,
            miner_address: None,
            mining_enabled: true,
            mining_interval_ms: 1_000,
            sync_interval_ms: 5_000,
            epoch_blocks: 100,
            validator_keys: Vec::new(),
            validator_stake: 1_000,
            chain: ChainConfig::default(),
            finality: FinalityConfig::default(),
            slashing: SlashingConfig::default(),
            // A lone node is its own validator set.
            validator_set: ValidatorSetConfig { set_size: 1 },
        }
    }
}

impl NodeConfig {
    /// Small, fast settings for tests and local networks.
    pub fn for_testing() -> Self {
        Self {
            mining_interval_ms: 10,
            sync_interval_ms: 50,
            epoch_blocks: 5,
            chain: ChainConfig::for_testing(),
            finality: FinalityConfig::for_testing(),
            slashing: SlashingConfig::for_testing(),
            ..Self::default()
        }
    }

    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from defaults overridden by whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        let get = |var: &'static str| lookup(var).map(|v| (var, v.trim().to_string()));

        if let Some((_, dir)) = get("LC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some((var, seed)) = get("LC_MINER_SEED") {
            config.miner_seed = Some(parse_hex(var, &seed)?);
        }
        if let Some((var, address)) = get("LC_MINER_ADDRESS") {
            config.miner_address = Some(parse_hex(var, &address)?);
        }
        if let Some((var, value)) = get("LC_MINING") {
            config.mining_enabled = parse_bool(var, &value)?;
        }
        if let Some((var, keys)) = get("LC_VALIDATOR_KEYS") {
            config.validator_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| parse_hex(var, k))
                .collect::<ConfigResult<_>>()?;
        }
        if let Some((_, path)) = get("LC_GENESIS_FILE") {
            config.chain.genesis = load_genesis(&path)?;
        }

        override_num(&get, "LC_MINING_INTERVAL_MS", &mut config.mining_interval_ms)?;
        override_num(&get, "LC_SYNC_INTERVAL_MS", &mut config.sync_interval_ms)?;
        override_num(&get, "LC_EPOCH_BLOCKS", &mut config.epoch_blocks)?;
        override_num(&get, "LC_VALIDATOR_STAKE", &mut config.validator_stake)?;
        override_num(&get, "LC_VALIDATOR_SET_SIZE", &mut config.validator_set.set_size)?;
        override_num(&get, "LC_TOMBSTONE_THRESHOLD", &mut config.slashing.tombstone_threshold)?;
        override_num(&get, "LC_QUORUM_NUM", &mut config.finality.quorum_numerator)?;
        override_num(&get, "LC_QUORUM_DEN", &mut config.finality.quorum_denominator)?;
        override_num(&get, "LC_DIFFICULTY", &mut config.chain.production.difficulty)?;
        override_num(&get, "LC_MINING_BACKOFF_MS", &mut config.chain.production.mining_backoff_ms)?;
        override_num(&get, "LC_CHECKPOINT_INTERVAL", &mut config.chain.checkpoint_interval)?;
        override_num(&get, "LC_PEER_TIMEOUT_MS", &mut config.chain.peer_timeout_ms)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.chain.validate().map_err(ConfigError::Invalid)?;
        self.finality.validate().map_err(ConfigError::Invalid)?;
        self.slashing.validate().map_err(ConfigError::Invalid)?;
        self.validator_set.validate().map_err(ConfigError::Invalid)?;

        if self.mining_interval_ms == 0 || self.sync_interval_ms == 0 {
            return Err(ConfigError::Invalid("task intervals must be positive".into()));
        }
        if self.epoch_blocks == 0 {
            return Err(ConfigError::Invalid("epoch_blocks must be positive".into()));
        }
        if self.validator_stake == 0 {
            return Err(ConfigError::Invalid("validator_stake must be positive".into()));
        }
        let candidates = self.validator_keys.len() + 1;
        if candidates < self.validator_set.set_size {
            return Err(ConfigError::Invalid(format!(
                "validator set size {} exceeds the {} configured validators",
                self.validator_set.set_size, candidates
            )));
        }
        Ok(())
    }
}

fn override_num<T: FromStr>(
    get: &impl Fn(&'static str) -> Option<(&'static str, String)>,
    var: &'static str,
    field: &mut T,
) -> ConfigResult<()>
where
    T::Err: std::fmt::Display,
{
    if let Some((var, value)) = get(var) {
        *field = value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        })?;
    }
    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

fn parse_hex<const N: usize>(var: &'static str, value: &str) -> ConfigResult<[u8; N]> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason,
    };
    let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|e| invalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| invalid(format!("expected {N} bytes, got {}", b.len())))
}

fn load_genesis(path: &str) -> ConfigResult<GenesisConfig> {
    let failed = |reason: String| ConfigError::Genesis {
        path: path.to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| failed(e.to_string()))
}
