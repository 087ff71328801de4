//! # Gateway Runtime
//!
//! Owns the broker, the in-process backend services and the validation
//! engine for the lifetime of the process.
//!
//! ## Startup Sequence
//!
//! 1. Start the merchant and role responders on their request topics
//! 2. Start the validation gateway (fails fast if a consumer cannot subscribe)
//! 3. Serve HTTP until the shutdown signal
//! 4. Stop consumers, then responders

use crate::config::RuntimeConfig;
use crate::handlers::{ResponderHandle, ValidationResponder};
use crate::router::build_router;
use anyhow::{Context, Result};
use axum::Router;
use gateway_bus::InMemoryBroker;
use pg_api_gateway::{InMemoryCache, ValidationGateway};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Consumer group of the in-process merchant service.
pub const MERCHANT_SERVICE_GROUP: &str = "merchant-service";
/// Consumer group of the in-process role service.
pub const ROLE_SERVICE_GROUP: &str = "role-service";

/// The running gateway process.
pub struct GatewayRuntime {
    config: RuntimeConfig,
    broker: InMemoryBroker,
    gateway: Arc<ValidationGateway>,
    responders: Vec<ResponderHandle>,
}

impl GatewayRuntime {
    /// Start the responders and the validation engine.
    pub async fn start(config: RuntimeConfig) -> Result<Self> {
        Self::start_with_broker(config, InMemoryBroker::new()).await
    }

    /// Same as [`GatewayRuntime::start`] on an existing broker.
    pub async fn start_with_broker(config: RuntimeConfig, broker: InMemoryBroker) -> Result<Self> {
        info!("===========================================");
        info!("  Payment Gateway API edge v{}", pg_api_gateway::VERSION);
        info!("===========================================");

        let responders = start_responders(&config, &broker).await?;

        let gateway = ValidationGateway::start(
            config.gateway.clone(),
            Arc::new(broker.clone()),
            &broker,
            Arc::new(InMemoryCache::new()),
        )
        .await
        .context("Failed to start validation gateway")?;

        Ok(Self {
            config,
            broker,
            gateway: Arc::new(gateway),
            responders,
        })
    }

    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.gateway))
    }

    pub fn gateway(&self) -> &Arc<ValidationGateway> {
        &self.gateway
    }

    pub fn broker(&self) -> &InMemoryBroker {
        &self.broker
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Serve HTTP until `signal` resolves, then shut down.
    pub async fn serve(self, signal: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = self.config.gateway.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(addr = %addr, "HTTP server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .context("HTTP server failed")?;

        self.shutdown().await;
        Ok(())
    }

    /// Stop the validation consumers, then the responders.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        match Arc::try_unwrap(self.gateway) {
            Ok(gateway) => gateway.shutdown().await,
            Err(gateway) => {
                warn!(
                    pending = gateway.pending_count(),
                    "Gateway still referenced, consumers stop when the last reference drops"
                );
            }
        }

        for responder in &self.responders {
            responder.shutdown();
        }
        for responder in self.responders {
            responder.join().await;
        }

        info!("Shutdown complete");
    }
}

async fn start_responders(
    config: &RuntimeConfig,
    broker: &InMemoryBroker,
) -> Result<Vec<ResponderHandle>> {
    let directory = &config.directory;
    let producer = Arc::new(broker.clone());

    let merchants = directory.merchant_directory();
    let roles = directory.role_directory();
    if merchants.is_empty() && roles.is_empty() {
        warn!("Backend directories are empty, every validation will be rejected");
    }
    info!(merchants = merchants.len(), users = roles.len(), "Seeding backend directories");

    let merchant_service = ValidationResponder::new(merchants, producer.clone())
        .with_delay(directory.reply_delay)
        .start(
            broker,
            &config.gateway.merchant_validator.request_topic,
            MERCHANT_SERVICE_GROUP,
        )
        .await
        .context("Failed to start merchant responder")?;

    let role_service = ValidationResponder::new(roles, producer)
        .with_delay(directory.reply_delay)
        .start(
            broker,
            &config.gateway.role_validator.request_topic,
            ROLE_SERVICE_GROUP,
        )
        .await
        .context("Failed to start role responder")?;

    Ok(vec![merchant_service, role_service])
}
