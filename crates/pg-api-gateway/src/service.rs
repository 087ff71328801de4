//! Validation gateway - wires both validators to the broker and cache.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::ipc::{ConsumerHandle, RequestPublisher};
use crate::middleware::{DeadlineLayer, ValidationLayer};
use crate::ports::outbound::ValidationCache;
use crate::validator::{
    MerchantKeyScheme, MerchantKeyValidator, RoleScheme, RoleValidator, Validator,
};
use gateway_bus::{MessageProducer, MessageSubscriber};
use std::sync::Arc;
use tracing::{info, warn};

/// Running validation engine: both validators and their response consumers.
pub struct ValidationGateway {
    config: GatewayConfig,
    merchant: Arc<MerchantKeyValidator>,
    role: Arc<RoleValidator>,
    consumers: Vec<ConsumerHandle>,
}

impl ValidationGateway {
    /// Validate `config`, build both validators and start their response
    /// consumers.
    ///
    /// Fails if any consumer cannot subscribe; the process must not serve
    /// traffic without them, since every validation would run out its timeout.
    pub async fn start(
        config: GatewayConfig,
        producer: Arc<dyn MessageProducer>,
        subscriber: &dyn MessageSubscriber,
        cache: Arc<dyn ValidationCache>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        info!("Starting validation gateway...");

        let publisher = RequestPublisher::new(producer);

        let merchant = Arc::new(Validator::new(
            MerchantKeyScheme,
            &config.merchant_validator,
            publisher.clone(),
            Arc::clone(&cache),
        ));
        let role = Arc::new(Validator::new(
            RoleScheme,
            &config.role_validator,
            publisher,
            cache,
        ));

        let merchant_consumer = merchant.start_consumer(subscriber).await?;
        let role_consumer = match role.start_consumer(subscriber).await {
            Ok(handle) => handle,
            Err(e) => {
                merchant_consumer.shutdown();
                merchant_consumer.join().await;
                return Err(e.into());
            }
        };

        info!(
            merchant_topic = merchant.response_topic(),
            role_topic = role.response_topic(),
            "Validation gateway started"
        );

        Ok(Self {
            config,
            merchant,
            role,
            consumers: vec![merchant_consumer, role_consumer],
        })
    }

    /// Layer authenticating merchants by API key
    pub fn merchant_layer(&self) -> ValidationLayer<MerchantKeyScheme> {
        ValidationLayer::new(Arc::clone(&self.merchant))
    }

    /// Layer resolving the authenticated user's roles
    pub fn role_layer(&self) -> ValidationLayer<RoleScheme> {
        ValidationLayer::new(Arc::clone(&self.role))
    }

    /// Layer stamping requests with the configured deadline
    pub fn deadline_layer(&self) -> DeadlineLayer {
        DeadlineLayer::new(self.config.http.request_timeout)
    }

    pub fn merchant_validator(&self) -> &Arc<MerchantKeyValidator> {
        &self.merchant
    }

    pub fn role_validator(&self) -> &Arc<RoleValidator> {
        &self.role
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn consumers(&self) -> &[ConsumerHandle] {
        &self.consumers
    }

    /// Requests currently waiting on either validator
    pub fn pending_count(&self) -> usize {
        self.merchant.pending_count() + self.role.pending_count()
    }

    /// True while every response consumer is running
    pub fn is_healthy(&self) -> bool {
        self.consumers.iter().all(|consumer| !consumer.is_finished())
    }

    /// Stop the response consumers and wait for them to exit.
    pub async fn shutdown(self) {
        info!("Shutting down validation gateway...");
        for consumer in &self.consumers {
            consumer.shutdown();
        }
        for consumer in self.consumers {
            let name = consumer.name();
            consumer.join().await;
            info!(validator = name, "Response consumer stopped");
        }
        let pending = self.merchant.pending_count() + self.role.pending_count();
        if pending > 0 {
            warn!(pending = pending, "Shutdown with validations still in flight");
        }
    }
}
