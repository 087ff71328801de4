//! Correlation registry - routes replies to the request waiting for them.
//!
//! Maps correlation IDs to single-slot channels. A slot lives exactly as long
//! as its [`PendingSlot`] guard, so every exit path of a request (reply,
//! timeout, cancellation, panic) removes its entry.

use crate::domain::correlation::CorrelationId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Result of handing a reply to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The waiting request now holds the reply
    Delivered,
    /// No request is waiting on this id (late, foreign or already finished)
    UnknownId,
    /// A reply was already delivered to this slot; this one was dropped
    Duplicate,
    /// The request gave up between lookup and send
    WaiterGone,
}

/// Registry counters
#[derive(Debug, Default)]
pub struct RegistryStats {
    pub registered: AtomicU64,
    pub delivered: AtomicU64,
    pub duplicates: AtomicU64,
    pub unknown: AtomicU64,
}

/// Thread-safe map of in-flight validation requests.
///
/// Flow:
/// 1. Request task mints a [`CorrelationId`] and calls `register()`
/// 2. Request task publishes, then awaits [`PendingSlot::recv`]
/// 3. Response consumer calls `deliver()` with the decoded reply
/// 4. The guard is dropped and the id unregistered
///
/// The lock guards only map lookups and mutations; channel sends happen after
/// it is released.
pub struct CorrelationRegistry<T> {
    slots: RwLock<HashMap<CorrelationId, Entry<T>>>,
    next_token: AtomicU64,
    stats: RegistryStats,
}

struct Entry<T> {
    sender: mpsc::Sender<T>,
    /// Distinguishes a slot from a later one registered under the same id
    token: u64,
}

impl<T: Send + 'static> CorrelationRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            stats: RegistryStats::default(),
        }
    }

    /// Create a slot for `id` and return the guard that owns its receiving end.
    ///
    /// Re-registering a live id replaces the old slot; the earlier waiter then
    /// sees its channel closed and times out.
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> PendingSlot<T> {
        let (sender, receiver) = mpsc::channel(1);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let replaced = self.slots.write().insert(id, Entry { sender, token });
        if replaced.is_some() {
            warn!(correlation_id = %id, "Correlation id registered twice; replacing slot");
        }
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        debug!(correlation_id = %id, "Registered pending validation");

        PendingSlot {
            id,
            token,
            receiver,
            registry: Arc::clone(self),
        }
    }

    /// Route a reply to its waiter. Never blocks; undeliverable replies are
    /// dropped.
    pub fn deliver(&self, id: CorrelationId, reply: T) -> DeliveryOutcome {
        let sender = self.slots.read().get(&id).map(|entry| entry.sender.clone());

        let Some(sender) = sender else {
            self.stats.unknown.fetch_add(1, Ordering::Relaxed);
            warn!(correlation_id = %id, "Reply for unknown or expired correlation id");
            return DeliveryOutcome::UnknownId;
        };

        match sender.try_send(reply) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %id, "Delivered reply");
                DeliveryOutcome::Delivered
            }
            Err(TrySendError::Full(_)) => {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                warn!(correlation_id = %id, "Duplicate reply dropped");
                DeliveryOutcome::Duplicate
            }
            Err(TrySendError::Closed(_)) => {
                debug!(correlation_id = %id, "Waiter gone before delivery");
                DeliveryOutcome::WaiterGone
            }
        }
    }

    /// Remove the slot for `id`. Returns false if it was not registered.
    pub fn unregister(&self, id: &CorrelationId) -> bool {
        self.slots.write().remove(id).is_some()
    }

    /// Number of in-flight requests
    pub fn pending_count(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.slots.read().contains_key(id)
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

impl<T: Send + 'static> Default for CorrelationRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of one registered slot. Unregisters on drop.
pub struct PendingSlot<T: Send + 'static> {
    id: CorrelationId,
    token: u64,
    receiver: mpsc::Receiver<T>,
    registry: Arc<CorrelationRegistry<T>>,
}

impl<T: Send + 'static> PendingSlot<T> {
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Wait for the reply. `None` if the slot was replaced.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T: Send + 'static> Drop for PendingSlot<T> {
    fn drop(&mut self) {
        let mut slots = self.registry.slots.write();
        // A replacement slot under the same id is left alone.
        if slots.get(&self.id).is_some_and(|entry| entry.token == self.token) {
            slots.remove(&self.id);
        }
    }
}
