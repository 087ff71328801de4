//! HTTP surface of the gateway binary.
//!
//! | Route | Guard |
//! |-------|-------|
//! | `GET /health` | none |
//! | `GET /merchant/me` | merchant API key |
//! | `GET /admin/overview` | user roles, `ADMIN` required |

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use pg_api_gateway::{AuthenticatedSubject, MerchantId, RequireRolesLayer, RoleSet, ValidationGateway};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Header carrying the user id in place of a verified token.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Roles allowed on `/admin/*`
pub const ADMIN_ROLES: [&str; 1] = ["ADMIN"];

/// Build the router. Layers run outermost first: trace, deadline, then the
/// per-route validators.
pub fn build_router(gateway: Arc<ValidationGateway>) -> Router {
    let merchant = Router::new()
        .route("/merchant/me", get(merchant_me))
        .route_layer(gateway.merchant_layer());

    let admin = Router::new()
        .route("/admin/overview", get(admin_overview))
        .route_layer(RequireRolesLayer::new(ADMIN_ROLES))
        .route_layer(gateway.role_layer())
        .route_layer(middleware::from_fn(subject_from_header));

    Router::new()
        .route("/health", get(health))
        .merge(merchant)
        .merge(admin)
        .layer(gateway.deadline_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Stand-in for the token authentication stage: trusts `x-user-id`.
async fn subject_from_header(mut req: Request, next: Next) -> Response {
    let subject = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|raw| AuthenticatedSubject(json!(raw)));

    if let Some(subject) = subject {
        req.extensions_mut().insert(subject);
    }
    next.run(req).await
}

async fn health(State(gateway): State<Arc<ValidationGateway>>) -> impl IntoResponse {
    let healthy = gateway.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "pending_validations": gateway.pending_count(),
            "version": pg_api_gateway::VERSION,
        })),
    )
}

async fn merchant_me(Extension(merchant_id): Extension<MerchantId>) -> Json<serde_json::Value> {
    Json(json!({ "merchant_id": merchant_id }))
}

async fn admin_overview(
    State(gateway): State<Arc<ValidationGateway>>,
    Extension(roles): Extension<RoleSet>,
) -> Json<serde_json::Value> {
    let consumers: Vec<_> = gateway
        .consumers()
        .iter()
        .map(|consumer| {
            json!({
                "validator": consumer.name(),
                "running": !consumer.is_finished(),
            })
        })
        .collect();

    Json(json!({
        "roles": roles,
        "pending_validations": gateway.pending_count(),
        "consumers": consumers,
    }))
}
