//! Generic correlated request/reply over the broker.

use crate::adapters::pending::CorrelationRegistry;
use crate::domain::context::CancelSignal;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::ValidationError;
use crate::ipc::publisher::RequestPublisher;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One request topic, one reply topic, one registry.
///
/// `request` registers a slot before publishing, so a reply that arrives
/// ahead of the wait is still delivered. The slot guard is dropped on every
/// exit path, which unregisters the id.
pub struct CorrelatedClient<Req, Resp: Send + 'static> {
    name: &'static str,
    registry: Arc<CorrelationRegistry<Resp>>,
    publisher: RequestPublisher,
    request_topic: String,
    reply_topic: String,
    timeout: Duration,
    _request: PhantomData<fn(Req)>,
}

impl<Req, Resp> CorrelatedClient<Req, Resp>
where
    Req: Serialize,
    Resp: Send + 'static,
{
    pub fn new(
        name: &'static str,
        registry: Arc<CorrelationRegistry<Resp>>,
        publisher: RequestPublisher,
        request_topic: impl Into<String>,
        reply_topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            registry,
            publisher,
            request_topic: request_topic.into(),
            reply_topic: reply_topic.into(),
            timeout,
            _request: PhantomData,
        }
    }

    /// Publish a request built from a fresh correlation id and the reply
    /// topic, then wait for its reply.
    ///
    /// The wait ends at the earlier of the configured timeout and `deadline`,
    /// or as soon as `cancel` fires. Both end in
    /// [`ValidationError::ValidationTimeout`].
    pub async fn request(
        &self,
        build: impl FnOnce(CorrelationId, &str) -> Req,
        deadline: Option<Instant>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Resp, ValidationError> {
        if cancel.is_some_and(CancelSignal::is_cancelled) {
            return Err(ValidationError::ValidationTimeout {
                waited: Duration::ZERO,
                cancelled: true,
            });
        }

        let id = CorrelationId::new();
        let mut slot = self.registry.register(id);

        let request = build(id, &self.reply_topic);
        self.publisher.publish(&self.request_topic, id, &request).await?;

        let bound = self.wait_bound(deadline);
        let started = Instant::now();

        let cancelled = async {
            match cancel {
                Some(signal) => signal.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            reply = tokio::time::timeout(bound, slot.recv()) => match reply {
                Ok(Some(reply)) => {
                    debug!(
                        validator = self.name,
                        correlation_id = %id,
                        elapsed_ms = started.elapsed().as_millis(),
                        "Validation reply received"
                    );
                    Ok(reply)
                }
                // Slot replaced by a colliding registration; treat as no reply.
                Ok(None) | Err(_) => {
                    warn!(
                        validator = self.name,
                        correlation_id = %id,
                        bound_ms = bound.as_millis(),
                        "Validation reply timed out"
                    );
                    Err(ValidationError::ValidationTimeout {
                        waited: started.elapsed(),
                        cancelled: false,
                    })
                }
            },
            _ = cancelled => {
                debug!(validator = self.name, correlation_id = %id, "Validation wait cancelled");
                Err(ValidationError::ValidationTimeout {
                    waited: started.elapsed(),
                    cancelled: true,
                })
            }
        }
    }

    /// `min(configured timeout, time left before deadline)`
    pub fn wait_bound(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => self
                .timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.timeout,
        }
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry<Resp>> {
        &self.registry
    }

    pub fn request_topic(&self) -> &str {
        &self.request_topic
    }

    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
