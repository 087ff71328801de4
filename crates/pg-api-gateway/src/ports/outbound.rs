//! Outbound ports for the validation engine.

use async_trait::async_trait;
use std::time::Duration;

/// Cache failure. Validators log these and fall back to the broker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Key/value cache for verified principals (cache-aside).
///
/// Values are opaque strings; each validation scheme owns its encoding.
#[async_trait]
pub trait ValidationCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns true if an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}
