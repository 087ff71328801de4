//! Response consumer - one background task per validator.
//!
//! Subscribes to the validator's response topic as a member of its consumer
//! group, decodes each reply, and hands it to the correlation registry.
//! Every message is acknowledged, including ones that fail to decode or
//! match no waiting request; redelivering them could never succeed.

use crate::adapters::pending::{CorrelationRegistry, DeliveryOutcome};
use crate::domain::error::ValidationError;
use crate::domain::messages::CorrelatedReply;
use gateway_bus::{Delivery, MessageSubscriber, Subscription};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Consumer counters
#[derive(Debug, Default)]
pub struct ConsumerStats {
    /// Messages received from the subscription
    pub processed: AtomicU64,
    /// Messages that did not decode into a reply
    pub malformed: AtomicU64,
    /// Replies handed to a waiting request
    pub delivered: AtomicU64,
}

/// Routes replies from a response topic into a [`CorrelationRegistry`].
pub struct ResponseConsumer<R: Send + 'static> {
    name: &'static str,
    subscription: Subscription,
    registry: Arc<CorrelationRegistry<R>>,
    stats: Arc<ConsumerStats>,
    shutdown: watch::Receiver<bool>,
}

impl<R> ResponseConsumer<R>
where
    R: DeserializeOwned + CorrelatedReply + Send + 'static,
{
    /// Subscribe to `topic` as a member of `group` and spawn the consumer loop.
    ///
    /// The subscription happens before this returns: an unreachable broker is
    /// reported as [`ValidationError::ConsumerStartup`] and no task is spawned.
    pub async fn start(
        subscriber: &dyn MessageSubscriber,
        topic: &str,
        group: &str,
        registry: Arc<CorrelationRegistry<R>>,
        name: &'static str,
    ) -> Result<ConsumerHandle, ValidationError> {
        let subscription = subscriber.subscribe(topic, group).await.map_err(|e| {
            error!(validator = name, topic = topic, error = %e, "Response consumer failed to subscribe");
            ValidationError::ConsumerStartup {
                topic: topic.to_string(),
                reason: e.to_string(),
            }
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(ConsumerStats::default());

        let consumer = Self {
            name,
            subscription,
            registry,
            stats: Arc::clone(&stats),
            shutdown: shutdown_rx,
        };

        info!(validator = name, topic = topic, group = group, "Response consumer started");
        let task = tokio::spawn(consumer.run());

        Ok(ConsumerHandle {
            name,
            shutdown: shutdown_tx,
            task,
            stats,
        })
    }

    #[instrument(skip(self), name = "response_consumer", fields(validator = self.name, topic = %self.subscription.topic()))]
    async fn run(self) {
        let Self {
            name,
            mut subscription,
            registry,
            stats,
            mut shutdown,
        } = self;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(validator = name, "Response consumer shutdown signal received");
                    break;
                }
                next = subscription.next() => match next {
                    Some(delivery) => handle_delivery(delivery, &registry, &stats),
                    None => {
                        error!(validator = name, "Response subscription closed, consumer stopping");
                        break;
                    }
                },
            }
        }
    }
}

fn handle_delivery<R>(delivery: Delivery, registry: &CorrelationRegistry<R>, stats: &ConsumerStats)
where
    R: DeserializeOwned + CorrelatedReply + Send + 'static,
{
    stats.processed.fetch_add(1, Ordering::Relaxed);

    match serde_json::from_slice::<R>(&delivery.message.payload) {
        Ok(reply) => {
            let correlation_id = reply.correlation_id();
            if registry.deliver(correlation_id, reply) == DeliveryOutcome::Delivered {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(e) => {
            stats.malformed.fetch_add(1, Ordering::Relaxed);
            let err = ValidationError::MalformedResponse(e.to_string());
            warn!(
                offset = delivery.message.offset,
                key = ?delivery.message.key,
                error = %err,
                "Skipping undecodable reply"
            );
        }
    }

    delivery.ack();
    debug!("Reply acknowledged");
}

/// Handle to a running response consumer. Dropping it stops the loop.
pub struct ConsumerHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<ConsumerStats>,
}

impl ConsumerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Signal the loop to stop after the message in hand.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(validator = self.name, error = %e, "Response consumer task failed");
        }
    }
}
