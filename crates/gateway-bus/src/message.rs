//! # Broker Messages
//!
//! Envelope types that flow through the broker and the errors a broker
//! operation can raise.

use bytes::Bytes;
use thiserror::Error;

/// Errors from broker operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker cannot be reached (closed, disconnected, not started).
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The topic name is not acceptable to the broker.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    /// Internal broker state is unusable.
    #[error("broker internal error: {0}")]
    Internal(String),
}

/// A message about to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Partitioning key (the correlation id for request/reply traffic).
    pub key: Option<String>,
    /// Serialized payload.
    pub payload: Bytes,
}

impl OutboundMessage {
    /// Create a keyed message.
    pub fn new(topic: impl Into<String>, key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: Some(key.into()),
            payload: payload.into(),
        }
    }

    /// Create a message without a key.
    pub fn unkeyed(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
        }
    }
}

/// A message as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Partitioning key, if the producer set one.
    pub key: Option<String>,
    /// Serialized payload.
    pub payload: Bytes,
    /// Broker-assigned sequence number, unique per broker instance.
    pub offset: u64,
}

impl BrokerMessage {
    pub(crate) fn from_outbound(message: OutboundMessage, offset: u64) -> Self {
        Self {
            topic: message.topic,
            key: message.key,
            payload: message.payload,
            offset,
        }
    }
}

/// Reject empty or whitespace-bearing topic names.
pub(crate) fn validate_topic(topic: &str) -> Result<(), BrokerError> {
    if topic.is_empty() || topic.chars().any(char::is_whitespace) {
        return Err(BrokerError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}
