//! Task lifecycle for one node.

use crate::node::Node;
use crate::tasks::{spawn_mining, spawn_sync};
use lc_08_consensus::PeerClient;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct NodeRuntime {
    node: Arc<Node>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    pub fn new(node: Arc<Node>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            node,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Start the sync task and, if enabled, the mining task.
    pub fn start(&mut self, peers: Vec<Arc<dyn PeerClient>>) {
        self.tasks.push(spawn_sync(
            Arc::clone(&self.node),
            peers,
            self.shutdown_rx.clone(),
        ));
        if self.node.config().mining_enabled {
            self.tasks
                .push(spawn_mining(Arc::clone(&self.node), self.shutdown_rx.clone()));
        }
    }

    /// Stop mining, signal every task and wait for them to finish.
    pub async fn shutdown(self) {
        tracing::info!("[node] initiating graceful shutdown");
        self.node.chain().mining_control().stop();
        if let Err(e) = self.shutdown_tx.send(true) {
            tracing::error!("[node] failed to send shutdown signal: {}", e);
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("[node] task ended abnormally: {}", e);
            }
        }
        match ledger_telemetry::gather_metrics() {
            Ok(metrics) => tracing::debug!("[node] final metrics:\n{}", metrics),
            Err(e) => tracing::debug!("[node] metrics unavailable: {}", e),
        }
        tracing::info!(
            "[node] shutdown complete at height {}",
            self.node.chain().height()
        );
    }
}
