//! Logging configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Service name attached to every event
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `info,pg_api_gateway=debug`
    pub level: String,

    /// Whether to emit JSON formatted logs
    pub json: bool,

    /// Whether to include source file and line
    pub with_source: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "pg-api-gateway".to_string(),
            level: "info".to_string(),
            json: false,
            with_source: false,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PG_GATEWAY_SERVICE_NAME`: Service name (default: pg-api-gateway)
    /// - `PG_GATEWAY_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `PG_GATEWAY_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `PG_GATEWAY_LOG_SOURCE`: Include file and line (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("PG_GATEWAY_SERVICE_NAME").unwrap_or(defaults.service_name),

            level: lookup("PG_GATEWAY_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.level),

            json: lookup("PG_GATEWAY_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            with_source: lookup("PG_GATEWAY_LOG_SOURCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.with_source),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
