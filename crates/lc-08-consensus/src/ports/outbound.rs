//! Driven ports (outbound dependencies)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Block, Hash, Transaction};

/// What a peer claims about its chain.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Index of the peer's tip; the chain holds `height + 1` blocks.
    pub height: u64,
    #[serde_as(as = "Hex")]
    pub tip_hash: Hash,
}

/// Remote node queried during sync.
///
/// Production: transport-specific client supplied by the host
/// Testing: `LocalPeer` wrapping another in-process `ChainManager`
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Label used in logs.
    fn id(&self) -> String;

    async fn chain_info(&self) -> Result<ChainInfo, String>;

    /// Full chain from genesis.
    async fn fetch_blocks(&self) -> Result<Vec<Block>, String>;
}

/// Gossip of locally produced data. Fire and forget.
pub trait Broadcaster: Send + Sync {
    fn broadcast_block(&self, block: &Block);

    fn broadcast_transaction(&self, tx: &Transaction);
}
