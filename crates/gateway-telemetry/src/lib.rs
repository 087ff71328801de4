//! # Gateway Telemetry
//!
//! Structured logging bootstrap for the payment gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env())?;
//!     // Events from every crate now go to stdout
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | - | Full filter directive, overrides everything |
//! | `PG_GATEWAY_LOG_LEVEL` | `info` | Log level filter |
//! | `PG_GATEWAY_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `PG_GATEWAY_SERVICE_NAME` | `pg-api-gateway` | Service name |
//! | `PG_GATEWAY_LOG_SOURCE` | `false` | Include file and line |

mod config;
mod logging;

pub use config::LogConfig;
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Logging initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
