//! Domain types for the validation engine.
//!
//! Configuration, errors, wire messages, and the request-scoped context the
//! validators read from. Async infrastructure (registry, cache) lives in the
//! adapters layer.

pub mod config;
pub mod context;
pub mod correlation;
pub mod error;
pub mod messages;
pub mod principal;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig, HttpConfig, ValidatorConfig};
pub use context::{CancelHandle, CancelSignal, RequestContext, RequestDeadline};
pub use correlation::CorrelationId;
pub use error::{ApiError, ErrorClass, GatewayError, ValidationError};
pub use messages::{CorrelatedReply, CorrelatedRequest};
pub use principal::{AuthenticatedSubject, MerchantId, RoleSet};
