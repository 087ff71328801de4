//! # Payment Gateway Runtime
//!
//! Process wiring for the API edge: configuration, the in-process merchant
//! and role services, the validation engine and the HTTP router.
//!
//! ## Modular Structure
//!
//! - `config` - Runtime configuration from file and environment
//! - `handlers` - Backend responders answering validation requests
//! - `router` - axum routes guarded by the validation layers
//! - `runtime` - Startup and graceful shutdown

pub mod config;
pub mod handlers;
pub mod router;
pub mod runtime;

pub use config::{ConfigLoadError, DirectoryConfig, RuntimeConfig};
pub use router::build_router;
pub use runtime::GatewayRuntime;
