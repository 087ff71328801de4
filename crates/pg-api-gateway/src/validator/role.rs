//! User role scheme.

use super::scheme::ValidationScheme;
use super::subject::normalize_user_id;
use crate::domain::context::RequestContext;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::ValidationError;
use crate::domain::messages::{RoleValidationRequest, RoleValidationResponse};
use crate::domain::principal::RoleSet;

/// Authenticated user id → granted roles
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleScheme;

impl ValidationScheme for RoleScheme {
    const NAME: &'static str = "role";

    type Subject = i64;
    type Request = RoleValidationRequest;
    type Reply = RoleValidationResponse;
    type Principal = RoleSet;

    fn extract_subject(&self, ctx: &RequestContext) -> Result<i64, ValidationError> {
        let subject = ctx
            .subject
            .as_ref()
            .ok_or(ValidationError::CredentialMissing("authenticated user id"))?;
        normalize_user_id(subject)
    }

    fn cache_key(&self, user_id: &i64) -> String {
        format!("user:roles:{}", user_id)
    }

    fn build_request(
        &self,
        user_id: &i64,
        correlation_id: CorrelationId,
        reply_topic: &str,
    ) -> RoleValidationRequest {
        RoleValidationRequest {
            user_id: *user_id,
            correlation_id,
            reply_topic: reply_topic.to_string(),
        }
    }

    fn interpret(&self, reply: RoleValidationResponse) -> Result<RoleSet, ValidationError> {
        let roles: RoleSet = reply
            .role_names
            .into_iter()
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .collect();

        if !reply.valid || roles.is_empty() {
            return Err(ValidationError::ValidationRejected { validator: Self::NAME });
        }
        Ok(roles)
    }
}
