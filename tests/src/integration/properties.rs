//! # Engine Properties
//!
//! Behaviour that must hold regardless of timing: replies reach only their
//! own request, nothing stays registered after a call, duplicates and
//! strangers are dropped, the tighter of deadline and timeout wins, and a
//! cache hit never touches the broker.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{
        api_key_context, config_with_timeout, eventually, Harness,
    };
    use futures::future::join_all;
    use pg_api_gateway::domain::messages::{ApiKeyValidationRequest, ApiKeyValidationResponse};
    use pg_api_gateway::{
        CancelSignal, CorrelationId, GatewayConfig, MerchantId, ValidationCache, ValidationError,
    };
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::Instant;

    fn accepted(correlation_id: CorrelationId, merchant_id: i64) -> ApiKeyValidationResponse {
        ApiKeyValidationResponse {
            correlation_id,
            valid: true,
            merchant_id,
        }
    }

    // =============================================================================
    // UNIQUENESS UNDER LOAD
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_cross_talk_under_load() {
        const REQUESTS: i64 = 200;

        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;

        // Backend collects every request first, then answers in reverse order.
        let answering = tokio::spawn(async move {
            let mut pending = Vec::new();
            for _ in 0..REQUESTS {
                let request: ApiKeyValidationRequest = backend.next_request().await;
                pending.push(request);
            }
            for request in pending.iter().rev() {
                let merchant_id: i64 = request
                    .api_key
                    .trim_start_matches("key-")
                    .parse()
                    .unwrap();
                backend.reply(&accepted(request.correlation_id, merchant_id)).await;
            }
        });

        let calls = (1..=REQUESTS).map(|n| {
            let validator = harness.gateway.merchant_validator().clone();
            tokio::spawn(async move {
                let result = validator.authenticate(&api_key_context(&format!("key-{n}"))).await;
                (n, result)
            })
        });

        for joined in join_all(calls).await {
            let (n, result) = joined.unwrap();
            assert_eq!(result, Ok(MerchantId(n)), "request {n} got another reply");
        }
        answering.await.unwrap();

        assert_eq!(harness.gateway.pending_count(), 0);
        let stats = harness.gateway.merchant_validator().registry().stats();
        assert_eq!(stats.registered.load(Ordering::Relaxed), REQUESTS as u64);
        assert_eq!(stats.delivered.load(Ordering::Relaxed), REQUESTS as u64);
    }

    // =============================================================================
    // NO LEAK
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_no_entry_left_after_any_outcome() {
        let harness = Harness::start(config_with_timeout(Duration::from_millis(300))).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        // success, rejection, timeout
        for (key, reply) in [("ok", Some(true)), ("bad", Some(false)), ("silent", None)] {
            let call = {
                let validator = validator.clone();
                tokio::spawn(async move { validator.authenticate(&api_key_context(key)).await })
            };
            let request: ApiKeyValidationRequest = backend.next_request().await;
            assert!(validator.registry().is_pending(&request.correlation_id));

            if let Some(valid) = reply {
                backend
                    .reply(&ApiKeyValidationResponse {
                        correlation_id: request.correlation_id,
                        valid,
                        merchant_id: 5,
                    })
                    .await;
            }

            let _ = call.await.unwrap();
            assert!(!validator.registry().is_pending(&request.correlation_id));
            assert_eq!(validator.pending_count(), 0, "entry left after {key}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_unregisters() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let (handle, signal) = CancelSignal::new();
        let call = {
            let validator = validator.clone();
            tokio::spawn(async move {
                validator
                    .authenticate(&api_key_context("abc").with_cancel(signal))
                    .await
            })
        };

        let _request: ApiKeyValidationRequest = backend.next_request().await;
        assert_eq!(validator.pending_count(), 1);

        handle.cancel();
        let result = call.await.unwrap();
        assert!(matches!(
            result,
            Err(ValidationError::ValidationTimeout { cancelled: true, .. })
        ));
        assert_eq!(validator.pending_count(), 0);
    }

    // =============================================================================
    // DUPLICATE, UNKNOWN AND LATE REPLIES
    // =============================================================================

    #[tokio::test]
    async fn test_duplicate_reply_observed_once() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let call = {
            let validator = validator.clone();
            tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await })
        };
        let request: ApiKeyValidationRequest = backend.next_request().await;
        backend.reply(&accepted(request.correlation_id, 42)).await;
        backend.reply(&accepted(request.correlation_id, 99)).await;

        assert_eq!(call.await.unwrap(), Ok(MerchantId(42)));

        let consumer = &harness.gateway.consumers()[0];
        assert!(eventually(|| consumer.stats().processed.load(Ordering::Relaxed) == 2).await);
        assert_eq!(consumer.stats().delivered.load(Ordering::Relaxed), 1);

        // Consumer still serves later requests
        let call = {
            let validator = validator.clone();
            tokio::spawn(async move { validator.authenticate(&api_key_context("def")).await })
        };
        let request: ApiKeyValidationRequest = backend.next_request().await;
        backend.reply(&accepted(request.correlation_id, 7)).await;
        assert_eq!(call.await.unwrap(), Ok(MerchantId(7)));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_replies_do_not_disturb_waiters() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let call = {
            let validator = validator.clone();
            tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await })
        };
        let request: ApiKeyValidationRequest = backend.next_request().await;

        backend.reply(&accepted(CorrelationId::new(), 666)).await;
        backend.reply_raw(b"{not json".to_vec()).await;
        backend.reply(&accepted(request.correlation_id, 42)).await;

        assert_eq!(call.await.unwrap(), Ok(MerchantId(42)));

        let consumer = &harness.gateway.consumers()[0];
        assert!(eventually(|| consumer.stats().processed.load(Ordering::Relaxed) == 3).await);
        assert_eq!(consumer.stats().malformed.load(Ordering::Relaxed), 1);
        assert_eq!(validator.registry().stats().unknown.load(Ordering::Relaxed), 1);
        // Every reply was acknowledged
        assert!(eventually(|| harness.broker.messages_acknowledged() >= 4).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_discarded() {
        let harness = Harness::start(config_with_timeout(Duration::from_millis(100))).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let call = {
            let validator = validator.clone();
            tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await })
        };
        let request: ApiKeyValidationRequest = backend.next_request().await;
        assert!(matches!(
            call.await.unwrap(),
            Err(ValidationError::ValidationTimeout { .. })
        ));

        backend.reply(&accepted(request.correlation_id, 42)).await;
        let consumer = &harness.gateway.consumers()[0];
        assert!(eventually(|| consumer.stats().processed.load(Ordering::Relaxed) == 1).await);

        assert_eq!(consumer.stats().delivered.load(Ordering::Relaxed), 0);
        assert!(harness.cache.is_empty());
        assert_eq!(validator.pending_count(), 0);
    }

    // =============================================================================
    // TIMEOUT PRECEDENCE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_beats_configured_timeout() {
        let harness = Harness::start(config_with_timeout(Duration::from_secs(5))).await;
        let validator = harness.gateway.merchant_validator();

        let started = Instant::now();
        let result = validator
            .authenticate(&api_key_context("abc").with_timeout(Duration::from_millis(50)))
            .await;
        let waited = started.elapsed();

        assert!(matches!(result, Err(ValidationError::ValidationTimeout { .. })));
        assert!(waited >= Duration::from_millis(50));
        assert!(waited < Duration::from_millis(100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_timeout_beats_distant_deadline() {
        let harness = Harness::start(config_with_timeout(Duration::from_millis(80))).await;
        let validator = harness.gateway.merchant_validator();

        let started = Instant::now();
        let result = validator
            .authenticate(&api_key_context("abc").with_timeout(Duration::from_secs(30)))
            .await;

        assert!(matches!(result, Err(ValidationError::ValidationTimeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    // =============================================================================
    // CACHE BYPASS
    // =============================================================================

    #[tokio::test]
    async fn test_cache_hit_publishes_nothing() {
        let harness = Harness::start(GatewayConfig::default()).await;
        harness
            .cache
            .set("merchant:api_key:abc", "42".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let result = harness
            .gateway
            .merchant_validator()
            .authenticate(&api_key_context("abc"))
            .await;

        assert_eq!(result, Ok(MerchantId(42)));
        assert_eq!(harness.broker.messages_published(), 0);
        assert_eq!(harness.gateway.merchant_validator().registry().stats().registered.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_falls_back_to_broker() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        harness
            .cache
            .set("merchant:api_key:abc", "not-a-number".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let validator = harness.gateway.merchant_validator().clone();
        let call = tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await });

        let request: ApiKeyValidationRequest = backend.next_request().await;
        backend.reply(&accepted(request.correlation_id, 42)).await;

        assert_eq!(call.await.unwrap(), Ok(MerchantId(42)));
        assert_eq!(
            harness.cache.get("merchant:api_key:abc").await.unwrap().as_deref(),
            Some("42")
        );
    }

    #[tokio::test]
    async fn test_unbounded_cache_ttl_still_caches() {
        let mut config = GatewayConfig::default();
        config.merchant_validator.cache_ttl = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_ok());

        let harness = Harness::start(config).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();
        let call = tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await });

        let request: ApiKeyValidationRequest = backend.next_request().await;
        backend.reply(&accepted(request.correlation_id, 42)).await;

        assert_eq!(call.await.unwrap(), Ok(MerchantId(42)));
        assert_eq!(
            harness.cache.get("merchant:api_key:abc").await.unwrap().as_deref(),
            Some("42")
        );
    }
}
