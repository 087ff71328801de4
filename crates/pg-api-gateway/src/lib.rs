#![allow(missing_docs)]

//! Payment Gateway API edge - asynchronous credential validation.
//!
//! Authenticates inbound requests by asking a backend service over the
//! message broker and waiting for the correlated reply.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          VALIDATION ENGINE                                   │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │   HTTP request ──► DeadlineLayer ──► ValidationLayer<S> ──► handler          │
//! │                                           │                                 │
//! │                              ┌────────────┴────────────┐                    │
//! │                              │      Validator<S>        │                    │
//! │                              │ cache → register →       │                    │
//! │                              │ publish → wait(bound)    │                    │
//! │                              └───┬───────────────┬──────┘                    │
//! │                                  │               │                           │
//! │                   ┌──────────────┴───┐   ┌───────┴──────────────┐           │
//! │                   │ RequestPublisher │   │ CorrelationRegistry   │           │
//! │                   └────────┬─────────┘   └───────▲──────────────┘           │
//! │                            │                     │ deliver                   │
//! │                            │            ┌────────┴─────────┐                 │
//! │                            │            │ ResponseConsumer │ (1 task)        │
//! │                            │            └────────▲─────────┘                 │
//! └────────────────────────────┼─────────────────────┼───────────────────────────┘
//!                    request topic            response topic
//!                              ▼                     │
//!                     merchant / role service ───────┘
//! ```
//!
//! # Validators
//!
//! - **Merchant API key**: `x-api-key` header → merchant id
//! - **User roles**: pre-authenticated user id → role names
//!
//! Both are [`validator::Validator`] instances parameterised by a
//! [`validator::ValidationScheme`]; the concurrency-critical code exists once.
//!
//! # Usage
//!
//! ```ignore
//! use pg_api_gateway::{GatewayConfig, ValidationGateway};
//!
//! let gateway = ValidationGateway::start(config, producer, &broker, cache).await?;
//! let app = Router::new()
//!     .route("/payments", post(create_payment))
//!     .route_layer(gateway.merchant_layer())
//!     .layer(gateway.deadline_layer());
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod middleware;
pub mod ports;
pub mod service;
pub mod validator;

// Re-exports for public API
pub use adapters::cache::InMemoryCache;
pub use adapters::pending::{CorrelationRegistry, DeliveryOutcome, PendingSlot};
pub use domain::config::{GatewayConfig, ValidatorConfig};
pub use domain::context::{CancelHandle, CancelSignal, RequestContext, RequestDeadline};
pub use domain::correlation::CorrelationId;
pub use domain::error::{ApiError, ErrorClass, GatewayError, ValidationError};
pub use domain::principal::{AuthenticatedSubject, MerchantId, RoleSet};
pub use ipc::{ConsumerHandle, CorrelatedClient, RequestPublisher, ResponseConsumer};
pub use middleware::{DeadlineLayer, RequireRolesLayer, ValidationLayer};
pub use ports::outbound::{CacheError, ValidationCache};
pub use service::ValidationGateway;
pub use validator::{
    MerchantKeyScheme, MerchantKeyValidator, RoleScheme, RoleValidator, ValidationScheme,
    Validator,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
