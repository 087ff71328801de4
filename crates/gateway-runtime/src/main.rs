//! # Payment Gateway API Edge
//!
//! Entry point: load configuration, initialise logging, start the runtime
//! and serve until Ctrl+C.

use anyhow::{Context, Result};
use gateway_runtime::{GatewayRuntime, RuntimeConfig};
use gateway_telemetry::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.log).context("Failed to initialise logging")?;

    let runtime = GatewayRuntime::start(config).await?;

    info!("Gateway is running. Press Ctrl+C to stop.");
    runtime
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
}
