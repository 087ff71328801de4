//! In-memory [`ValidationCache`] with per-entry expiry.

use crate::domain::context::instant_after;
use crate::ports::outbound::{CacheError, ValidationCache};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Concurrent TTL cache. Expired entries are dropped lazily on read and by
/// [`InMemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ValidationCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if *expires_at > now {
                return Ok(Some(value.clone()));
            }
        }
        self.entries
            .remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value, instant_after(ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }
}
