//! # HTTP Flows
//!
//! The full router from the runtime crate: trace, deadline, validation and
//! role layers in front of real handlers, with the in-process backend
//! services answering over the broker.

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use gateway_runtime::config::{DirectoryConfig, RuntimeConfig};
    use gateway_runtime::router::USER_ID_HEADER;
    use gateway_runtime::GatewayRuntime;
    use serde_json::{json, Value};
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    const MERCHANT_KEY: &str = "sk_test_demo_merchant";

    async fn runtime(configure: impl FnOnce(&mut RuntimeConfig)) -> (GatewayRuntime, Router) {
        let mut config = RuntimeConfig {
            directory: DirectoryConfig::demo(),
            ..RuntimeConfig::default()
        };
        configure(&mut config);
        let runtime = GatewayRuntime::start(config).await.unwrap();
        let router = runtime.router();
        (runtime, router)
    }

    async fn get(router: &Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, challenge, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_merchant_key_round_trip_then_cached() {
        let (runtime, router) = runtime(|_| {}).await;

        let (status, _, body) = get(&router, "/merchant/me", &[("x-api-key", MERCHANT_KEY)]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "merchant_id": 1001 }));

        let published = runtime.broker().messages_published();
        let (status, _, _) = get(&router, "/merchant/me", &[("x-api-key", MERCHANT_KEY)]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(runtime.broker().messages_published(), published);
    }

    #[tokio::test]
    async fn test_unknown_key_is_unauthorized_with_challenge() {
        let (_runtime, router) = runtime(|_| {}).await;

        let (status, challenge, body) = get(&router, "/merchant/me", &[("x-api-key", "sk_unknown")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(challenge.as_deref(), Some("ApiKey header=\"x-api-key\""));
        assert_eq!(body["error"]["code"], pg_api_gateway::domain::error::codes::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_slow_backend_maps_to_gateway_timeout() {
        let (runtime, router) = runtime(|config| {
            config.directory.reply_delay = Duration::from_millis(400);
            config.gateway.merchant_validator.timeout = Duration::from_millis(100);
        })
        .await;

        let (status, challenge, body) = get(&router, "/merchant/me", &[("x-api-key", MERCHANT_KEY)]).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(challenge.is_none());
        assert_eq!(body["error"]["code"], pg_api_gateway::domain::error::codes::TIMEOUT);
        assert_eq!(runtime.gateway().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_request_budget_cuts_validation_short() {
        let (runtime, router) = runtime(|config| {
            config.directory.reply_delay = Duration::from_secs(2);
            config.gateway.http.request_timeout = Duration::from_millis(50);
        })
        .await;

        let started = Instant::now();
        let (status, _, _) = get(&router, "/merchant/me", &[("x-api-key", MERCHANT_KEY)]).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(runtime.gateway().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_route_role_checks() {
        let (_runtime, router) = runtime(|_| {}).await;

        let (status, _, body) = get(&router, "/admin/overview", &[(USER_ID_HEADER, "1")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roles"], json!(["ADMIN"]));

        let (status, _, _) = get(&router, "/admin/overview", &[(USER_ID_HEADER, "2")]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = get(&router, "/admin/overview", &[(USER_ID_HEADER, "404")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = get(&router, "/admin/overview", &[(USER_ID_HEADER, "abc")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_reports_pending_validations() {
        let (runtime, router) = runtime(|_| {}).await;

        let (status, _, body) = get(&router, "/health", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending_validations"], 0);

        drop(router);
        runtime.shutdown().await;
    }
}
