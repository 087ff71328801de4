//! # Validation Scenarios
//!
//! End-to-end outcomes of one `authenticate` call against a scripted
//! backend:
//!
//! 1. **Accepted**: reply `valid = true` yields the principal and warms the cache
//! 2. **Rejected**: reply `valid = false` yields a rejection, cache untouched
//! 3. **Silent backend**: no reply yields a timeout after the configured bound

#[cfg(test)]
mod tests {
    use crate::integration::harness::{api_key_context, config_with_timeout, subject_context, Harness};
    use pg_api_gateway::domain::messages::{
        ApiKeyValidationRequest, ApiKeyValidationResponse, RoleValidationRequest,
        RoleValidationResponse,
    };
    use pg_api_gateway::{GatewayConfig, MerchantId, RoleSet, ValidationCache, ValidationError};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    // =============================================================================
    // MERCHANT API KEY
    // =============================================================================

    #[tokio::test]
    async fn test_accepted_key_returns_merchant_and_warms_cache() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let call = tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await });

        let request: ApiKeyValidationRequest = backend.next_request().await;
        assert_eq!(request.api_key, "abc");
        assert_eq!(request.reply_topic, "api-key-validation-response");

        backend
            .reply(&ApiKeyValidationResponse {
                correlation_id: request.correlation_id,
                valid: true,
                merchant_id: 42,
            })
            .await;

        assert_eq!(call.await.unwrap(), Ok(MerchantId(42)));
        assert_eq!(
            harness.cache.get("merchant:api_key:abc").await.unwrap().as_deref(),
            Some("42")
        );
        assert_eq!(harness.gateway.pending_count(), 0);

        // Served from the cache from now on
        let published = harness.broker.messages_published();
        let again = harness
            .gateway
            .merchant_validator()
            .authenticate(&api_key_context("abc"))
            .await;
        assert_eq!(again, Ok(MerchantId(42)));
        assert_eq!(harness.broker.messages_published(), published);
    }

    #[tokio::test]
    async fn test_rejected_key_leaves_cache_untouched() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.merchant_backend().await;
        let validator = harness.gateway.merchant_validator().clone();

        let call = tokio::spawn(async move { validator.authenticate(&api_key_context("abc")).await });

        let request: ApiKeyValidationRequest = backend.next_request().await;
        backend
            .reply(&json!({ "correlation_id": request.correlation_id, "valid": false }))
            .await;

        assert_eq!(
            call.await.unwrap(),
            Err(ValidationError::ValidationRejected { validator: "merchant" })
        );
        assert!(harness.cache.is_empty());
        assert_eq!(harness.gateway.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_backend_times_out_after_configured_bound() {
        let harness = Harness::start(config_with_timeout(Duration::from_secs(2))).await;
        let validator = harness.gateway.merchant_validator();

        let started = Instant::now();
        let result = validator.authenticate(&api_key_context("abc")).await;
        let waited = started.elapsed();

        assert!(matches!(
            result,
            Err(ValidationError::ValidationTimeout { cancelled: false, .. })
        ));
        assert!(waited >= Duration::from_secs(2));
        assert!(waited < Duration::from_millis(2100));
        assert_eq!(validator.pending_count(), 0);
        assert!(harness.cache.is_empty());
    }

    // =============================================================================
    // USER ROLES
    // =============================================================================

    #[tokio::test]
    async fn test_roles_resolved_for_string_subject() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.role_backend().await;
        let validator = harness.gateway.role_validator().clone();

        let call = tokio::spawn(async move { validator.authenticate(&subject_context(json!(" 7 "))).await });

        let request: RoleValidationRequest = backend.next_request().await;
        assert_eq!(request.user_id, 7);
        assert_eq!(request.reply_topic, "role-validation-response");

        backend
            .reply(&RoleValidationResponse {
                correlation_id: request.correlation_id,
                valid: true,
                role_names: vec!["ADMIN".into(), " ".into(), "FINANCE".into()],
            })
            .await;

        let roles = call.await.unwrap().unwrap();
        assert_eq!(roles, RoleSet::from_iter(["ADMIN", "FINANCE"]));
        assert!(harness.cache.get("user:roles:7").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_user_without_roles_rejected() {
        let harness = Harness::start(GatewayConfig::default()).await;
        let mut backend = harness.role_backend().await;
        let validator = harness.gateway.role_validator().clone();

        let call = tokio::spawn(async move { validator.authenticate(&subject_context(json!(9))).await });

        let request: RoleValidationRequest = backend.next_request().await;
        backend
            .reply(&RoleValidationResponse {
                correlation_id: request.correlation_id,
                valid: true,
                role_names: vec![],
            })
            .await;

        assert_eq!(
            call.await.unwrap(),
            Err(ValidationError::ValidationRejected { validator: "role" })
        );
        assert!(harness.cache.is_empty());
    }

    #[tokio::test]
    async fn test_credential_errors_never_reach_broker() {
        let harness = Harness::start(GatewayConfig::default()).await;

        let missing_key = harness
            .gateway
            .merchant_validator()
            .authenticate(&pg_api_gateway::RequestContext::new())
            .await;
        assert!(matches!(missing_key, Err(ValidationError::CredentialMissing(_))));

        let missing_subject = harness
            .gateway
            .role_validator()
            .authenticate(&pg_api_gateway::RequestContext::new())
            .await;
        assert!(matches!(missing_subject, Err(ValidationError::CredentialMissing(_))));

        let bad_subject = harness
            .gateway
            .role_validator()
            .authenticate(&subject_context(json!("seven")))
            .await;
        assert!(matches!(bad_subject, Err(ValidationError::CredentialFormatInvalid(_))));

        assert_eq!(harness.broker.messages_published(), 0);
    }
}
