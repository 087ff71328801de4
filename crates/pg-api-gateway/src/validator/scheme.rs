//! The per-credential half of a validator.

use crate::domain::context::RequestContext;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::ValidationError;
use crate::domain::messages::CorrelatedReply;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// What distinguishes one credential kind from another.
///
/// Everything concurrency-related lives in [`super::Validator`]; a scheme only
/// reads the credential, names its cache entry, shapes the request, and
/// judges the reply.
pub trait ValidationScheme: Send + Sync + 'static {
    /// Short name used in logs and errors
    const NAME: &'static str;

    /// `WWW-Authenticate` challenge sent with a 401
    const CHALLENGE: &'static str = "Bearer";

    /// Normalized credential. `Display` must be safe to log.
    type Subject: fmt::Display + Send + Sync;
    type Request: Serialize + Send + Sync;
    type Reply: DeserializeOwned + CorrelatedReply + Send + 'static;
    type Principal: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Read the credential from the request. Must not touch the broker.
    fn extract_subject(&self, ctx: &RequestContext) -> Result<Self::Subject, ValidationError>;

    fn cache_key(&self, subject: &Self::Subject) -> String;

    fn build_request(
        &self,
        subject: &Self::Subject,
        correlation_id: CorrelationId,
        reply_topic: &str,
    ) -> Self::Request;

    /// Turn a reply into a principal, or [`ValidationError::ValidationRejected`]
    /// when the backend refused or returned an empty result.
    fn interpret(&self, reply: Self::Reply) -> Result<Self::Principal, ValidationError>;

    fn encode_principal(&self, principal: &Self::Principal) -> Option<String> {
        serde_json::to_string(principal).ok()
    }

    /// `None` for an entry that no longer decodes.
    fn decode_principal(&self, raw: &str) -> Option<Self::Principal> {
        serde_json::from_str(raw).ok()
    }
}
