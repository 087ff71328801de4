//! Credential validators.
//!
//! [`Validator`] runs the cache-aside, publish-and-wait flow once for every
//! credential kind; a [`ValidationScheme`] supplies the parts that differ.

pub mod merchant;
pub mod orchestrator;
pub mod role;
pub mod scheme;
pub mod subject;

pub use merchant::{ApiKey, MerchantKeyScheme, API_KEY_HEADER};
pub use orchestrator::Validator;
pub use role::RoleScheme;
pub use scheme::ValidationScheme;
pub use subject::normalize_user_id;

/// Validates the `x-api-key` header and yields a [`crate::MerchantId`].
pub type MerchantKeyValidator = Validator<MerchantKeyScheme>;

/// Resolves the authenticated user's roles into a [`crate::RoleSet`].
pub type RoleValidator = Validator<RoleScheme>;
