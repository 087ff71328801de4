//! Ports for the validation engine.

pub mod outbound;

pub use outbound::{CacheError, ValidationCache};
