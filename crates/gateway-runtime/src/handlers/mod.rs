//! # Backend Handlers
//!
//! Stand-ins for the merchant and role services. Each answers validation
//! requests from an in-memory directory over the broker.

pub mod directory;
pub mod responder;

pub use directory::{MerchantDirectory, RoleDirectory, SubjectDirectory};
pub use responder::{ResponderHandle, ValidationResponder};
