//! Role allow-list check for routes behind the role validator.

use super::auth::error_response;
use crate::domain::error::{codes, ApiError};
use crate::domain::principal::RoleSet;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Pass if the verified roles include any of `allowed`.
///
/// Requests without a [`RoleSet`] (the role validator did not run) are
/// refused.
pub fn check_roles(roles: Option<&RoleSet>, allowed: &[String]) -> Result<(), ApiError> {
    let granted = roles.is_some_and(|roles| roles.any_of(allowed.iter().map(String::as_str)));
    if granted {
        Ok(())
    } else {
        Err(ApiError::with_data(
            codes::FORBIDDEN,
            "Forbidden: role not permitted",
            serde_json::json!({ "required": allowed }),
        ))
    }
}

/// Role allow-list layer. Must sit inside the role validation layer.
#[derive(Debug, Clone)]
pub struct RequireRolesLayer {
    allowed: Arc<[String]>,
}

impl RequireRolesLayer {
    pub fn new<I, R>(allowed: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S> Layer<S> for RequireRolesLayer {
    type Service = RequireRolesService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRolesService {
            inner,
            allowed: Arc::clone(&self.allowed),
        }
    }
}

/// Role allow-list service
#[derive(Debug, Clone)]
pub struct RequireRolesService<S> {
    inner: S,
    allowed: Arc<[String]>,
}

impl<S> Service<Request<Body>> for RequireRolesService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if let Err(error) = check_roles(req.extensions().get::<RoleSet>(), &self.allowed) {
            warn!(path = %req.uri().path(), required = ?self.allowed, "Role check failed");
            return Box::pin(async move { Ok(error_response(StatusCode::FORBIDDEN, error)) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}
