//! # Gateway Bus - Message Broker Abstraction
//!
//! Topic-based publish/subscribe used by the API gateway to talk to backend
//! services (merchant service, role service) without direct calls.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐   publish(topic)   ┌──────────────┐   group "a"   ┌──────────┐
//! │   Producer   │ ─────────────────► │    Broker    │ ────────────► │ member 1 │
//! └──────────────┘                    │              │               │ member 2 │
//!                                     │              │   group "b"   └──────────┘
//!                                     │              │ ────────────► ┌──────────┐
//!                                     └──────────────┘               │ member 1 │
//!                                                                    └──────────┘
//! ```
//!
//! - Every consumer group subscribed to a topic receives one copy of each message.
//! - Inside a group, each message is handed to exactly one member.
//! - Delivery is at-least-once and unordered across keys; consumers acknowledge
//!   every delivery explicitly.
//!
//! [`InMemoryBroker`] implements both sides of the contract for single-process
//! deployments and tests. Networked brokers (Kafka, NATS) plug in behind the
//! [`MessageProducer`] and [`MessageSubscriber`] traits.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod message;
pub mod publisher;
pub mod subscriber;

pub use message::{BrokerError, BrokerMessage, OutboundMessage};
pub use publisher::{InMemoryBroker, MessageProducer};
pub use subscriber::{Acknowledge, Delivery, DeliverySource, MessageSubscriber, Subscription};

/// Default consumer group used when a component does not configure one.
pub const DEFAULT_CONSUMER_GROUP: &str = "gateway";
