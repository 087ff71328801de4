//! Adapters for the validation engine.
//!
//! In-process infrastructure behind the ports: the correlation registry that
//! bridges broker replies to waiting requests, and an in-memory cache.

pub mod cache;
pub mod pending;

pub use cache::InMemoryCache;
pub use pending::{CorrelationRegistry, DeliveryOutcome, PendingSlot, RegistryStats};
