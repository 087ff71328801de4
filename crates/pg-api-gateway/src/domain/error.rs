//! Validation engine error types and their user-visible mapping.
//!
//! Three classes must stay distinguishable for operators because the fix is
//! different for each: a client sent a bad credential, the backend did not
//! answer in time, or the gateway itself failed.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error codes carried in [`ApiError`] bodies
pub mod codes {
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TIMEOUT: i32 = -32006;
    pub const UNAUTHORIZED: i32 = -32010;
    pub const FORBIDDEN: i32 = -32011;
}

/// Failure of one `authenticate` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The request carries no credential. Raised before any broker traffic.
    #[error("credential missing: {0}")]
    CredentialMissing(&'static str),

    /// The credential is present but has an unusable shape. Raised before any
    /// broker traffic.
    #[error("credential format invalid: {0}")]
    CredentialFormatInvalid(String),

    /// The validation request could not be serialized or handed to the broker.
    #[error("failed to publish validation request to {topic}: {reason}")]
    PublishFailure { topic: String, reason: String },

    /// The backend answered and marked the credential invalid.
    #[error("credential rejected by {validator} validation")]
    ValidationRejected { validator: &'static str },

    /// No reply arrived within the wait bound, or the inbound request was
    /// cancelled while waiting.
    #[error("no validation reply after {}ms{}", .waited.as_millis(), cancel_suffix(.cancelled))]
    ValidationTimeout { waited: Duration, cancelled: bool },

    /// A reply could not be decoded.
    #[error("malformed validation response: {0}")]
    MalformedResponse(String),

    /// The response consumer could not subscribe.
    #[error("response consumer failed to subscribe to {topic}: {reason}")]
    ConsumerStartup { topic: String, reason: String },
}

fn cancel_suffix(cancelled: &bool) -> &'static str {
    if *cancelled {
        " (request cancelled)"
    } else {
        ""
    }
}

/// Remediation class of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing, malformed, or rejected credential.
    Client,
    /// Backend or broker did not answer in time.
    Timeout,
    /// Gateway-side fault.
    Internal,
}

impl ValidationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CredentialMissing(_)
            | Self::CredentialFormatInvalid(_)
            | Self::ValidationRejected { .. } => ErrorClass::Client,
            Self::ValidationTimeout { .. } => ErrorClass::Timeout,
            Self::PublishFailure { .. }
            | Self::MalformedResponse(_)
            | Self::ConsumerStartup { .. } => ErrorClass::Internal,
        }
    }

    /// HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Client => StatusCode::UNAUTHORIZED,
            ErrorClass::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body for the caller. Internal details are not exposed.
    pub fn to_api_error(&self) -> ApiError {
        match self.class() {
            ErrorClass::Client => ApiError::unauthorized(self.to_string()),
            ErrorClass::Timeout => ApiError::timeout("credential validation did not complete"),
            ErrorClass::Internal => ApiError::internal("credential validation unavailable"),
        }
    }
}

/// JSON error body returned by the gateway middleware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(
            codes::UNAUTHORIZED,
            format!("Unauthorized: {}", details.into()),
        )
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(codes::FORBIDDEN, format!("Forbidden: {}", details.into()))
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            codes::TIMEOUT,
            format!("Request timeout: {}", operation.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Gateway-level errors (startup and wiring, not per request)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A validator could not start; the process must not serve traffic.
    #[error("validator startup failed: {0}")]
    Startup(#[from] ValidationError),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("internal error: {0}")]
    Internal(String),
}
