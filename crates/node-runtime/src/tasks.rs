//! Background tasks. Both exit when the shutdown channel flips to `true`.

use crate::node::Node;
use lc_08_consensus::{ChainError, PeerClient};
use lc_17_block_production::BlockProductionError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Mine continuously. The nonce search runs on the blocking pool; a pause
/// set by an incoming peer block is waited out here.
pub fn spawn_mining(node: Arc<Node>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_millis(node.config().mining_interval_ms);
        let control = node.chain().mining_control();
        tracing::info!("[node] mining task started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let worker = Arc::clone(&node);
            let wait = match tokio::task::spawn_blocking(move || worker.mine_once()).await {
                Ok(Ok(_)) => interval,
                Ok(Err(ChainError::Production(BlockProductionError::Interrupted))) => {
                    let now = node.chain().now();
                    Duration::from_millis(control.paused_until().saturating_sub(now))
                }
                Ok(Err(ChainError::Production(BlockProductionError::Stopped))) => break,
                Ok(Err(ChainError::StaleTip { .. })) => Duration::ZERO,
                Ok(Err(e)) => {
                    tracing::warn!("[node] mining failed: {}", e);
                    interval
                }
                Err(e) => {
                    tracing::error!("[node] mining worker panicked: {}", e);
                    break;
                }
            };

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        tracing::info!("[node] mining task stopped");
    })
}

/// Sync with `peers` every `sync_interval_ms` and expire stale mempool
/// entries on the same beat.
pub fn spawn_sync(
    node: Arc<Node>,
    peers: Vec<Arc<dyn PeerClient>>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(node.config().sync_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!("[node] sync task started with {} peers", peers.len());

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            let report = node.chain().sync_with_network(&peers).await;
            if let Some(summary) = &report.adopted {
                tracing::info!(
                    "[node] synced to height {} from peers ({} rolled back)",
                    summary.new_height,
                    summary.rolled_back
                );
                node.on_new_tip();
            }
            for (peer, reason) in &report.failures {
                tracing::debug!("[node] sync with {} failed: {}", peer, reason);
            }

            let expired = node.chain().expire_mempool();
            if !expired.is_empty() {
                tracing::debug!("[node] expired {} mempool entries", expired.len());
            }
        }
        tracing::info!("[node] sync task stopped");
    })
}
