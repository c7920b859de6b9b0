//! In-process peer, used to wire nodes together inside one process.

use crate::ports::{ChainInfo, PeerClient};
use crate::service::ChainManager;
use async_trait::async_trait;
use shared_types::Block;
use std::sync::Arc;

pub struct LocalPeer {
    name: String,
    chain: Arc<ChainManager>,
}

impl LocalPeer {
    pub fn new(name: impl Into<String>, chain: Arc<ChainManager>) -> Self {
        Self {
            name: name.into(),
            chain,
        }
    }
}

#[async_trait]
impl PeerClient for LocalPeer {
    fn id(&self) -> String {
        self.name.clone()
    }

    async fn chain_info(&self) -> Result<ChainInfo, String> {
        Ok(ChainInfo {
            height: self.chain.height(),
            tip_hash: self.chain.tip_hash(),
        })
    }

    async fn fetch_blocks(&self) -> Result<Vec<Block>, String> {
        Ok(self.chain.blocks())
    }
}
