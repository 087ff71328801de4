//! # Message Publisher
//!
//! Defines the publishing side of the broker and the in-memory broker.

use crate::message::{validate_topic, BrokerError, BrokerMessage, OutboundMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Trait for publishing messages to the broker.
///
/// Publishing is fire-and-forget: a successful return means the broker
/// accepted the message, not that anyone processed it. Implementations do
/// not retry.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Publish a message.
    ///
    /// # Returns
    ///
    /// The number of consumer groups the message was routed to.
    ///
    /// # Errors
    ///
    /// `BrokerError::Unavailable` when the broker cannot accept messages.
    async fn publish(&self, message: OutboundMessage) -> Result<usize, BrokerError>;
}

/// Queue shared by every member of one consumer group on one topic.
pub(crate) struct GroupQueue {
    sender: mpsc::UnboundedSender<BrokerMessage>,
    pub(crate) receiver: Arc<Mutex<mpsc::UnboundedReceiver<BrokerMessage>>>,
    pub(crate) members: usize,
}

impl GroupQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            members: 0,
        }
    }
}

/// topic -> consumer group -> queue
pub(crate) type TopicTable = HashMap<String, HashMap<String, GroupQueue>>;

/// State shared between the broker handle and its live subscriptions.
pub(crate) struct BrokerState {
    pub(crate) topics: RwLock<TopicTable>,
    closed: AtomicBool,
    messages_published: AtomicU64,
    pub(crate) messages_acknowledged: AtomicU64,
    next_offset: AtomicU64,
}

impl BrokerState {
    pub(crate) fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Unavailable("in-memory broker is closed".into()));
        }
        Ok(())
    }
}

/// In-memory broker with consumer-group semantics.
///
/// Each (topic, group) pair owns an unbounded queue. Publishing copies the
/// message into the queue of every group subscribed to the topic; members of
/// a group take turns draining their shared queue. Messages published to a
/// topic with no subscribed group are dropped.
///
/// Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct InMemoryBroker {
    pub(crate) state: Arc<BrokerState>,
}

impl InMemoryBroker {
    /// Create an open broker with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(BrokerState {
                topics: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
                messages_published: AtomicU64::new(0),
                messages_acknowledged: AtomicU64::new(0),
                next_offset: AtomicU64::new(0),
            }),
        }
    }

    /// Close the broker.
    ///
    /// Publishing and subscribing fail afterwards, and every live
    /// subscription observes end-of-stream once its queue is drained.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
        if let Ok(mut topics) = self.state.topics.write() {
            topics.clear();
        }
        info!("In-memory broker closed");
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Number of consumer groups subscribed to a topic.
    #[must_use]
    pub fn group_count(&self, topic: &str) -> usize {
        self.state
            .topics
            .read()
            .map(|topics| topics.get(topic).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Number of live members in a consumer group.
    #[must_use]
    pub fn member_count(&self, topic: &str, group: &str) -> usize {
        self.state
            .topics
            .read()
            .map(|topics| {
                topics
                    .get(topic)
                    .and_then(|groups| groups.get(group))
                    .map_or(0, |queue| queue.members)
            })
            .unwrap_or(0)
    }

    /// Total messages accepted for publishing.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.state.messages_published.load(Ordering::Relaxed)
    }

    /// Total deliveries acknowledged by consumers.
    #[must_use]
    pub fn messages_acknowledged(&self) -> u64 {
        self.state.messages_acknowledged.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageProducer for InMemoryBroker {
    async fn publish(&self, message: OutboundMessage) -> Result<usize, BrokerError> {
        self.state.ensure_open()?;
        validate_topic(&message.topic)?;

        let topic = message.topic.clone();
        let offset = self.state.next_offset.fetch_add(1, Ordering::Relaxed);
        let message = BrokerMessage::from_outbound(message, offset);

        let routed = {
            let topics = self
                .state
                .topics
                .read()
                .map_err(|_| BrokerError::Internal("topic table lock poisoned".into()))?;

            let mut routed = 0;
            if let Some(groups) = topics.get(&topic) {
                for (group, queue) in groups {
                    if queue.sender.send(message.clone()).is_ok() {
                        routed += 1;
                    } else {
                        debug!(topic = %topic, group = %group, "Group queue closed, skipping");
                    }
                }
            }
            routed
        };

        self.state.messages_published.fetch_add(1, Ordering::Relaxed);

        if routed == 0 {
            warn!(topic = %topic, offset = offset, "Message dropped (no consumer groups)");
        } else {
            debug!(topic = %topic, offset = offset, groups = routed, "Message published");
        }

        Ok(routed)
    }
}
