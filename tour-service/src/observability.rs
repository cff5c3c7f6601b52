//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Initialize JSON tracing output filtered by `service.log_level`
///
/// `RUST_LOG`-style directives are accepted (`info,tour_service=debug`);
/// an unparsable level falls back to `info`.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|err| {
        eprintln!(
            "Invalid log level '{}' ({}), using info",
            config.service.log_level, err
        );
        EnvFilter::new("info")
    });

    // A subscriber may already be installed, e.g. by a test harness
    if tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already set");
    }

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

/// Shutdown tracing
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
