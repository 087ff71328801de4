//! Publishes validation requests to the broker.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::ValidationError;
use gateway_bus::{MessageProducer, OutboundMessage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Serializes requests and hands them to a [`MessageProducer`].
///
/// Messages are keyed by correlation id. A failure is returned to the caller
/// at once; there are no retries.
#[derive(Clone)]
pub struct RequestPublisher {
    producer: Arc<dyn MessageProducer>,
}

impl RequestPublisher {
    pub fn new(producer: Arc<dyn MessageProducer>) -> Self {
        Self { producer }
    }

    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        correlation_id: CorrelationId,
        payload: &T,
    ) -> Result<(), ValidationError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| ValidationError::PublishFailure {
            topic: topic.to_string(),
            reason: format!("serialization failed: {}", e),
        })?;

        let message = OutboundMessage::new(topic, correlation_id.to_string(), bytes);

        match self.producer.publish(message).await {
            Ok(0) => {
                warn!(
                    correlation_id = %correlation_id,
                    topic = topic,
                    "Validation request published but no consumer group is subscribed"
                );
                Ok(())
            }
            Ok(groups) => {
                debug!(
                    correlation_id = %correlation_id,
                    topic = topic,
                    groups = groups,
                    "Published validation request"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    correlation_id = %correlation_id,
                    topic = topic,
                    error = %e,
                    "Failed to publish validation request"
                );
                Err(ValidationError::PublishFailure {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
