//! Merchant API-key scheme.

use super::scheme::ValidationScheme;
use crate::domain::context::RequestContext;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::ValidationError;
use crate::domain::messages::{ApiKeyValidationRequest, ApiKeyValidationResponse};
use crate::domain::principal::MerchantId;
use std::fmt;

/// Header carrying the merchant API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// A merchant API key. `Display` shows only a prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        if prefix.len() < self.0.len() {
            write!(f, "{}****", prefix)
        } else {
            f.write_str("****")
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self)
    }
}

/// `x-api-key` header → merchant id
#[derive(Debug, Clone, Copy, Default)]
pub struct MerchantKeyScheme;

impl ValidationScheme for MerchantKeyScheme {
    const NAME: &'static str = "merchant";
    const CHALLENGE: &'static str = "ApiKey header=\"x-api-key\"";

    type Subject = ApiKey;
    type Request = ApiKeyValidationRequest;
    type Reply = ApiKeyValidationResponse;
    type Principal = MerchantId;

    fn extract_subject(&self, ctx: &RequestContext) -> Result<ApiKey, ValidationError> {
        let value = ctx
            .headers
            .get(API_KEY_HEADER)
            .ok_or(ValidationError::CredentialMissing("x-api-key header"))?;

        let key = value.to_str().map_err(|_| {
            ValidationError::CredentialFormatInvalid("x-api-key header is not visible ASCII".into())
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::CredentialMissing("x-api-key header"));
        }
        Ok(ApiKey::new(key))
    }

    fn cache_key(&self, subject: &ApiKey) -> String {
        format!("merchant:api_key:{}", subject.expose())
    }

    fn build_request(
        &self,
        subject: &ApiKey,
        correlation_id: CorrelationId,
        reply_topic: &str,
    ) -> ApiKeyValidationRequest {
        ApiKeyValidationRequest {
            api_key: subject.expose().to_string(),
            correlation_id,
            reply_topic: reply_topic.to_string(),
        }
    }

    fn interpret(&self, reply: ApiKeyValidationResponse) -> Result<MerchantId, ValidationError> {
        if !reply.valid || reply.merchant_id <= 0 {
            return Err(ValidationError::ValidationRejected { validator: Self::NAME });
        }
        Ok(MerchantId(reply.merchant_id))
    }
}
