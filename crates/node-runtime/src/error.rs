use crate::config::ConfigError;
use lc_02_block_storage::StorageError;
use lc_08_consensus::ChainError;
use lc_09_finality::FinalityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    #[error("finality: {0}")]
    Finality(#[from] FinalityError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

pub type NodeResult<T> = Result<T, NodeError>;
