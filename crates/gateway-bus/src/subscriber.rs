//! # Message Subscriber
//!
//! Defines the consuming side of the broker: consumer-group subscriptions and
//! acknowledged deliveries.

use crate::message::{validate_topic, BrokerError, BrokerMessage};
use crate::publisher::{BrokerState, GroupQueue, InMemoryBroker};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Trait for subscribing to a topic as a member of a consumer group.
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Join `group` on `topic`.
    ///
    /// # Errors
    ///
    /// `BrokerError::Unavailable` when the broker cannot be reached. Callers
    /// that depend on the subscription should treat this as fatal.
    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BrokerError>;
}

/// Acknowledgement hook attached to a delivery.
pub trait Acknowledge: Send {
    /// Commit the delivery so the broker does not hand it out again.
    fn ack(self: Box<Self>);
}

/// A message handed to one consumer-group member.
pub struct Delivery {
    /// The delivered message.
    pub message: BrokerMessage,
    acker: Option<Box<dyn Acknowledge>>,
}

impl Delivery {
    /// Wrap a message with its acknowledgement hook.
    pub fn new(message: BrokerMessage, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            message,
            acker: Some(acker),
        }
    }

    /// Acknowledge the delivery.
    pub fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.ack();
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .field("acknowledged", &self.acker.is_none())
            .finish()
    }
}

/// Backend-specific source of deliveries behind a [`Subscription`].
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Wait for the next delivery. `None` means the subscription has ended.
    async fn recv(&mut self) -> Option<Delivery>;
}

/// A live consumer-group membership.
///
/// Dropping the subscription leaves the group.
pub struct Subscription {
    topic: String,
    group: String,
    source: Box<dyn DeliverySource>,
}

impl Subscription {
    /// Create a subscription over any delivery source.
    pub fn new(
        topic: impl Into<String>,
        group: impl Into<String>,
        source: Box<dyn DeliverySource>,
    ) -> Self {
        Self {
            topic: topic.into(),
            group: group.into(),
            source,
        }
    }

    /// Receive the next delivery.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next message for this member
    /// - `None` - The broker closed the subscription
    pub async fn next(&mut self) -> Option<Delivery> {
        self.source.recv().await
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consumer group this member belongs to.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }
}

struct InMemoryAck {
    state: Arc<BrokerState>,
}

impl Acknowledge for InMemoryAck {
    fn ack(self: Box<Self>) {
        self.state.messages_acknowledged.fetch_add(1, Ordering::Relaxed);
    }
}

struct InMemorySource {
    topic: String,
    group: String,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<BrokerMessage>>>,
    state: Arc<BrokerState>,
}

#[async_trait]
impl DeliverySource for InMemorySource {
    async fn recv(&mut self) -> Option<Delivery> {
        let message = {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await?
        };
        Some(Delivery::new(
            message,
            Box::new(InMemoryAck {
                state: Arc::clone(&self.state),
            }),
        ))
    }
}

impl Drop for InMemorySource {
    fn drop(&mut self) {
        let Ok(mut topics) = self.state.topics.write() else {
            return;
        };
        let Some(groups) = topics.get_mut(&self.topic) else {
            return;
        };
        if let Some(queue) = groups.get_mut(&self.group) {
            queue.members = queue.members.saturating_sub(1);
            if queue.members == 0 {
                groups.remove(&self.group);
            }
        }
        if groups.is_empty() {
            topics.remove(&self.topic);
        }
        debug!(topic = %self.topic, group = %self.group, "Subscription dropped");
    }
}

#[async_trait]
impl MessageSubscriber for InMemoryBroker {
    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BrokerError> {
        self.state.ensure_open()?;
        validate_topic(topic)?;

        let receiver = {
            let mut topics = self
                .state
                .topics
                .write()
                .map_err(|_| BrokerError::Internal("topic table lock poisoned".into()))?;
            let queue = topics
                .entry(topic.to_string())
                .or_default()
                .entry(group.to_string())
                .or_insert_with(GroupQueue::new);
            queue.members += 1;
            Arc::clone(&queue.receiver)
        };

        debug!(topic = %topic, group = %group, "New subscription created");

        let source = InMemorySource {
            topic: topic.to_string(),
            group: group.to_string(),
            receiver,
            state: Arc::clone(&self.state),
        };
        Ok(Subscription::new(topic, group, Box::new(source)))
    }
}
