//! Tracing subscriber setup from the logging section of the config.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// The active filter: `RUST_LOG` when it is set and parses, else the configured level.
pub fn log_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing(logging: &LoggingConfig) {
    let _ = tracing_subscriber::registry()
        .with(log_filter(logging))
        .with(fmt::layer())
        .try_init();
}

pub fn shutdown_tracing() {
    tracing::info!("tracing shut down");
}
