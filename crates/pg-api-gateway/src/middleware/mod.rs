//! Middleware stack for the validation engine.
//!
//! Layer order: Request → Trace → Deadline → Validation<S> → RequireRoles → Handler
//!
//! [`DeadlineLayer`] must wrap the validation layers so each validator sees
//! the request's deadline. [`RequireRolesLayer`] must sit inside the role
//! validation layer so the [`crate::RoleSet`] extension is present.

pub mod auth;
pub mod authorization;
pub mod timeout;

pub use auth::{validation_error_response, ValidationLayer, ValidationService};
pub use authorization::{check_roles, RequireRolesLayer, RequireRolesService};
pub use timeout::{DeadlineLayer, DeadlineService};
