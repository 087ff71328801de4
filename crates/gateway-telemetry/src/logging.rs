//! Structured logging setup.
//!
//! JSON output carries the event fields (`validator`, `correlation_id`,
//! `topic`, ...) as top-level keys so a log shipper can index them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{LogConfig, TelemetryError};

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_file(config.with_source)
            .with_line_number(config.with_source);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.with_source)
            .with_line_number(config.with_source)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json,
        "Logging initialized"
    );

    Ok(())
}
