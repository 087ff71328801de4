//! Broker-facing request/reply plumbing.
//!
//! Validation requests go out through [`RequestPublisher`]; replies come back
//! through one [`ResponseConsumer`] task per validator, which hands them to the
//! [`crate::CorrelationRegistry`]. [`CorrelatedClient`] ties the three together
//! into one awaitable call.

pub mod client;
pub mod consumer;
pub mod publisher;

pub use client::CorrelatedClient;
pub use consumer::{ConsumerHandle, ConsumerStats, ResponseConsumer};
pub use publisher::RequestPublisher;
