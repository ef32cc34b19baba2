//! Logging bootstrap.
//!
//! `RUST_LOG` wins over the configured level. JSON output carries target,
//! thread ids and source location for log shippers; the human format keeps
//! only the target.

use crate::container::LogConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging could not be installed.
#[derive(Debug, thiserror::Error)]
#[error("logging init failed: {0}")]
pub struct TelemetryError(String);

/// Install the global subscriber.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError(e.to_string()))?;

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError(e.to_string()))
}
