//! # Validation Responder
//!
//! Listens on a validation request topic, answers each request from a
//! [`SubjectDirectory`] and publishes the reply to the topic the request
//! names.
//!
//! ## Request Flow
//!
//! ```text
//! ValidationLayer<S>
//!       │
//!       │ publishes request (reply_topic, correlation_id)
//!       ▼
//! ┌─────────────────┐
//! │  Broker         │
//! └─────────────────┘
//!       │
//!       │ ValidationResponder subscribes (its own consumer group)
//!       ▼
//! ┌─────────────────────────────────────┐
//! │  ValidationResponder<D>             │
//! │  - Decodes the request              │
//! │  - Looks the subject up in D        │
//! │  - Publishes the reply              │
//! └─────────────────────────────────────┘
//!       │
//!       │ reply on reply_topic
//!       ▼
//! ResponseConsumer → CorrelationRegistry
//! ```

use super::directory::SubjectDirectory;
use gateway_bus::{BrokerError, Delivery, MessageProducer, MessageSubscriber, OutboundMessage, Subscription};
use pg_api_gateway::domain::messages::CorrelatedRequest;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Answers validation requests for one directory.
pub struct ValidationResponder<D: SubjectDirectory> {
    directory: Arc<D>,
    producer: Arc<dyn MessageProducer>,
    /// Artificial latency before each reply
    delay: Duration,
}

impl<D: SubjectDirectory> ValidationResponder<D> {
    pub fn new(directory: D, producer: Arc<dyn MessageProducer>) -> Self {
        Self {
            directory: Arc::new(directory),
            producer,
            delay: Duration::ZERO,
        }
    }

    /// Delay every reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Subscribe to `topic` as a member of `group` and spawn the answer loop.
    pub async fn start(
        self,
        subscriber: &dyn MessageSubscriber,
        topic: &str,
        group: &str,
    ) -> Result<ResponderHandle, BrokerError> {
        let subscription = subscriber.subscribe(topic, group).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let answered = Arc::new(AtomicU64::new(0));

        info!(responder = D::NAME, topic = topic, group = group, "Validation responder started");
        let task = tokio::spawn(self.run(subscription, shutdown_rx, Arc::clone(&answered)));

        Ok(ResponderHandle {
            name: D::NAME,
            shutdown: shutdown_tx,
            task,
            answered,
        })
    }

    #[instrument(skip_all, name = "validation_responder", fields(responder = D::NAME))]
    async fn run(
        self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
        answered: Arc<AtomicU64>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Validation responder shutdown signal received");
                    break;
                }
                next = subscription.next() => match next {
                    Some(delivery) => self.handle(delivery, &answered),
                    None => {
                        error!("Request subscription closed, responder stopping");
                        break;
                    }
                },
            }
        }
    }

    fn handle(&self, delivery: Delivery, answered: &Arc<AtomicU64>) {
        let request = match serde_json::from_slice::<D::Request>(&delivery.message.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(offset = delivery.message.offset, error = %e, "Skipping undecodable request");
                delivery.ack();
                return;
            }
        };

        let correlation_id = request.correlation_id();
        let reply_topic = request.reply_topic().to_string();
        let reply = self.directory.answer(&request);
        delivery.ack();

        let payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(e) => {
                error!(correlation_id = %correlation_id, error = %e, "Failed to encode reply");
                return;
            }
        };

        let producer = Arc::clone(&self.producer);
        let answered = Arc::clone(answered);
        let delay = self.delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let message = OutboundMessage::new(reply_topic, correlation_id.to_string(), payload);
            match producer.publish(message).await {
                Ok(_) => {
                    answered.fetch_add(1, Ordering::Relaxed);
                    debug!(correlation_id = %correlation_id, "Reply published");
                }
                Err(e) => {
                    error!(correlation_id = %correlation_id, error = %e, "Failed to publish reply");
                }
            }
        });
    }
}

/// Handle to a running responder. Dropping it stops the loop.
pub struct ResponderHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    answered: Arc<AtomicU64>,
}

impl ResponderHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replies published so far
    pub fn answered(&self) -> u64 {
        self.answered.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(responder = self.name, error = %e, "Responder task failed");
        }
    }
}
