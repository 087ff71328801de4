//! Credential validation middleware.
//!
//! Runs a [`Validator`] on every request and, on success, inserts the verified
//! principal into the request extensions for the handler and later layers.

use crate::domain::context::RequestContext;
use crate::domain::error::{ApiError, ValidationError};
use crate::validator::{ValidationScheme, Validator};
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Validation layer for one credential kind
pub struct ValidationLayer<S: ValidationScheme> {
    validator: Arc<Validator<S>>,
}

impl<S: ValidationScheme> ValidationLayer<S> {
    pub fn new(validator: Arc<Validator<S>>) -> Self {
        Self { validator }
    }
}

impl<S: ValidationScheme> Clone for ValidationLayer<S> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<S: ValidationScheme, Inner> Layer<Inner> for ValidationLayer<S> {
    type Service = ValidationService<S, Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        ValidationService {
            inner,
            validator: Arc::clone(&self.validator),
        }
    }
}

/// Validation service
pub struct ValidationService<S: ValidationScheme, Inner> {
    inner: Inner,
    validator: Arc<Validator<S>>,
}

impl<S: ValidationScheme, Inner: Clone> Clone for ValidationService<S, Inner> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<S, Inner> Service<Request<Body>> for ValidationService<S, Inner>
where
    S: ValidationScheme,
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let validator = Arc::clone(&self.validator);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ctx = RequestContext::from_request(&req);

            match validator.authenticate(&ctx).await {
                Ok(principal) => {
                    debug!(validator = S::NAME, path = %req.uri().path(), "Request authenticated");
                    req.extensions_mut().insert(principal);
                    inner.call(req).await
                }
                Err(err) => {
                    warn!(
                        validator = S::NAME,
                        path = %req.uri().path(),
                        error = %err,
                        "Request failed validation"
                    );
                    Ok(validation_error_response(&err, S::CHALLENGE))
                }
            }
        })
    }
}

/// JSON error response for a failed validation. 401s carry `challenge`.
pub fn validation_error_response(err: &ValidationError, challenge: &'static str) -> Response {
    let status = err.status_code();
    let mut response = error_response(status, err.to_api_error());
    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(challenge),
        );
    }
    response
}

/// `{"error": {...}}` with the given status
pub(crate) fn error_response(status: StatusCode, error: ApiError) -> Response {
    (status, Json(serde_json::json!({ "error": error }))).into_response()
}
