//! Request deadline middleware.
//!
//! Stamps each request with an absolute [`RequestDeadline`] so validators can
//! bound their wait by the time the request has left, and cuts off requests
//! that overrun it.

use super::auth::error_response;
use crate::domain::context::{instant_after, RequestDeadline};
use crate::domain::error::ApiError;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use std::time::Duration;
use tokio::time::timeout_at;
use tower::{Layer, Service};
use tracing::warn;

/// Deadline layer
#[derive(Debug, Clone, Copy)]
pub struct DeadlineLayer {
    budget: Duration,
}

impl DeadlineLayer {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService {
            inner,
            budget: self.budget,
        }
    }
}

/// Deadline service
#[derive(Debug, Clone)]
pub struct DeadlineService<S> {
    inner: S,
    budget: Duration,
}

impl<S> Service<Request<Body>> for DeadlineService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
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
        let mut inner = self.inner.clone();

        // An upstream deadline that is already tighter wins.
        let mut deadline = instant_after(self.budget);
        if let Some(RequestDeadline(upstream)) = req.extensions().get::<RequestDeadline>() {
            deadline = deadline.min(*upstream);
        }
        req.extensions_mut().insert(RequestDeadline(deadline));

        let budget = self.budget;
        Box::pin(async move {
            match timeout_at(deadline, inner.call(req)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(budget_ms = budget.as_millis(), "Request deadline exceeded");
                    Ok(timeout_response(budget))
                }
            }
        })
    }
}

fn timeout_response(budget: Duration) -> Response {
    error_response(
        StatusCode::GATEWAY_TIMEOUT,
        ApiError::timeout(format!("request exceeded {}ms budget", budget.as_millis())),
    )
}
