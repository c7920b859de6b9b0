//! # Ledger Telemetry
//!
//! Logging and metrics for the consensus and mempool engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG`, then `LC_LOG_LEVEL` | `info` | Log level filter |
//! | `LC_JSON_LOGS` | `false` | JSON log lines |
//! | `LC_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `LC_SERVICE_NAME` | `ledger-core` | Tag on the startup event |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

#[doc(hidden)]
pub use tracing;

pub use config::TelemetryConfig;
pub use metrics::{gather_metrics, register_metrics, MetricsHandle, REGISTRY};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Installs the tracing subscriber and registers all metrics.
///
/// The returned guard must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(config)?;
    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
