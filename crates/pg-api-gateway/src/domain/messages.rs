//! Wire messages exchanged with the merchant and role services.
//!
//! Requests carry the reply topic so the backend knows where to answer;
//! replies echo the correlation id. Missing result fields decode to their
//! empty default, which the validators treat as a rejection.

use serde::{Deserialize, Serialize};

use super::correlation::CorrelationId;

/// A reply that can be routed back to its waiting request.
pub trait CorrelatedReply {
    fn correlation_id(&self) -> CorrelationId;
}

/// A request that names where its reply should go.
pub trait CorrelatedRequest {
    fn correlation_id(&self) -> CorrelationId;
    fn reply_topic(&self) -> &str;
}

/// Published on the merchant request topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyValidationRequest {
    pub api_key: String,
    pub correlation_id: CorrelationId,
    pub reply_topic: String,
}

/// Merchant service answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyValidationResponse {
    pub correlation_id: CorrelationId,
    pub valid: bool,
    #[serde(default)]
    pub merchant_id: i64,
}

/// Published on the role request topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleValidationRequest {
    pub user_id: i64,
    pub correlation_id: CorrelationId,
    pub reply_topic: String,
}

/// Role service answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleValidationResponse {
    pub correlation_id: CorrelationId,
    pub valid: bool,
    #[serde(default)]
    pub role_names: Vec<String>,
}

impl CorrelatedRequest for ApiKeyValidationRequest {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    fn reply_topic(&self) -> &str {
        &self.reply_topic
    }
}

impl CorrelatedRequest for RoleValidationRequest {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    fn reply_topic(&self) -> &str {
        &self.reply_topic
    }
}

impl CorrelatedReply for ApiKeyValidationResponse {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

impl CorrelatedReply for RoleValidationResponse {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}
