//! Subscriber installation: env filter plus a pretty or JSON fmt layer.

use tracing_subscriber::{
    layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::{TelemetryConfig, TelemetryError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console layer for `config`, or `None` when console output is off.
fn console_layer(config: &TelemetryConfig) -> Option<BoxedLayer> {
    if !config.console_output {
        return None;
    }
    let layer = tracing_subscriber::fmt::layer().with_target(true);
    Some(if config.json_logs {
        layer
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        layer.with_ansi(true).boxed()
    })
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Fails if a subscriber
/// is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing_subscriber::registry()
        .with(console_layer(config))
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "[telemetry] tracing initialized"
    );
    Ok(())
}
