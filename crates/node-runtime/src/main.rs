//! # Ledger-Core Node
//!
//! Runs one node until Ctrl-C. Configuration comes from `LC_*` environment
//! variables; see `node_runtime::config`.

use anyhow::{Context, Result};
use ledger_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{Node, NodeConfig, NodeRuntime};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("failed to load node configuration")?;
    info!("===========================================");
    info!("  Ledger-Core Node v{}", env!("CARGO_PKG_VERSION"));
    info!("  Service: {}", telemetry.service_name);
    info!("  Data Dir: {:?}", config.data_dir);
    info!("===========================================");

    let node = Node::open(config).context("failed to open node")?;
    let mut runtime = NodeRuntime::new(Arc::new(node));
    // No transport is wired in; peers are attached by embedding the runtime.
    runtime.start(Vec::new());

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
