//! Validation orchestrator - cache-aside lookup, then publish and wait.
//!
//! ```text
//! INIT ─► CACHE_LOOKUP ─┬─ hit ──────────────────────────────► SUCCESS
//!                       └─ miss ─► PUBLISHED ─► WAITING ─┬─ reply ─► SUCCESS | REJECTED
//!                                                        ├─ bound ─► TIMEOUT
//!                                                        └─ cancel ► CANCELLED
//! ```

use super::scheme::ValidationScheme;
use crate::adapters::pending::CorrelationRegistry;
use crate::domain::config::ValidatorConfig;
use crate::domain::context::RequestContext;
use crate::domain::error::ValidationError;
use crate::ipc::{ConsumerHandle, CorrelatedClient, RequestPublisher, ResponseConsumer};
use crate::ports::outbound::ValidationCache;
use gateway_bus::MessageSubscriber;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Authenticates one credential kind against its backend.
///
/// Per call: at most one publish, one register/unregister pair, and a cache
/// write only after the backend confirmed the credential.
pub struct Validator<S: ValidationScheme> {
    scheme: S,
    client: CorrelatedClient<S::Request, S::Reply>,
    cache: Arc<dyn ValidationCache>,
    cache_ttl: Duration,
    consumer_group: String,
}

impl<S: ValidationScheme> Validator<S> {
    /// Build a validator with its own registry.
    pub fn new(
        scheme: S,
        config: &ValidatorConfig,
        publisher: RequestPublisher,
        cache: Arc<dyn ValidationCache>,
    ) -> Self {
        Self::with_registry(scheme, config, publisher, cache, Arc::new(CorrelationRegistry::new()))
    }

    /// Build a validator around an existing registry.
    pub fn with_registry(
        scheme: S,
        config: &ValidatorConfig,
        publisher: RequestPublisher,
        cache: Arc<dyn ValidationCache>,
        registry: Arc<CorrelationRegistry<S::Reply>>,
    ) -> Self {
        let client = CorrelatedClient::new(
            S::NAME,
            registry,
            publisher,
            config.request_topic.clone(),
            config.response_topic.clone(),
            config.timeout,
        );
        Self {
            scheme,
            client,
            cache,
            cache_ttl: config.cache_ttl,
            consumer_group: config.consumer_group.clone(),
        }
    }

    /// Start the response consumer feeding this validator's registry.
    pub async fn start_consumer(
        &self,
        subscriber: &dyn MessageSubscriber,
    ) -> Result<ConsumerHandle, ValidationError> {
        ResponseConsumer::start(
            subscriber,
            self.client.reply_topic(),
            &self.consumer_group,
            Arc::clone(self.client.registry()),
            S::NAME,
        )
        .await
    }

    /// Authenticate the credential carried by `ctx`.
    #[instrument(skip(self, ctx), fields(validator = S::NAME))]
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<S::Principal, ValidationError> {
        let subject = self.scheme.extract_subject(ctx)?;
        let cache_key = self.scheme.cache_key(&subject);

        if let Some(principal) = self.cached(&cache_key).await {
            debug!(subject = %subject, "Validation cache hit");
            return Ok(principal);
        }

        let reply = self
            .client
            .request(
                |correlation_id, reply_topic| {
                    self.scheme.build_request(&subject, correlation_id, reply_topic)
                },
                ctx.deadline,
                ctx.cancel.as_ref(),
            )
            .await?;

        let principal = self.scheme.interpret(reply).inspect_err(|_| {
            debug!(subject = %subject, "Credential rejected by backend");
        })?;

        self.remember(&cache_key, &principal).await;
        debug!(subject = %subject, "Credential verified");
        Ok(principal)
    }

    /// Cache lookup. Faults and undecodable entries count as a miss.
    async fn cached(&self, key: &str) -> Option<S::Principal> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Validation cache read failed; using broker");
                return None;
            }
        };

        match self.scheme.decode_principal(&raw) {
            Some(principal) => Some(principal),
            None => {
                warn!("Discarding undecodable validation cache entry");
                if let Err(e) = self.cache.delete(key).await {
                    warn!(error = %e, "Failed to delete validation cache entry");
                }
                None
            }
        }
    }

    async fn remember(&self, key: &str, principal: &S::Principal) {
        let Some(raw) = self.scheme.encode_principal(principal) else {
            warn!("Verified principal could not be encoded for the cache");
            return;
        };
        if let Err(e) = self.cache.set(key, raw, self.cache_ttl).await {
            warn!(error = %e, "Validation cache write failed");
        }
    }

    /// Requests currently waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.client.registry().pending_count()
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry<S::Reply>> {
        self.client.registry()
    }

    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    pub fn request_topic(&self) -> &str {
        self.client.request_topic()
    }

    pub fn response_topic(&self) -> &str {
        self.client.reply_topic()
    }
}
