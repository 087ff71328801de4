//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Merchant API-key validation
    pub merchant_validator: ValidatorConfig,
    /// User role validation
    pub role_validator: ValidatorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            merchant_validator: ValidatorConfig::merchant(),
            role_validator: ValidatorConfig::role(),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "http request_timeout cannot be 0".into(),
            ));
        }

        self.merchant_validator.validate("merchant_validator")?;
        self.role_validator.validate("role_validator")?;

        // Two validators on one topic would steal each other's traffic.
        let topics = [
            &self.merchant_validator.request_topic,
            &self.merchant_validator.response_topic,
            &self.role_validator.request_topic,
            &self.role_validator.response_topic,
        ];
        let unique: HashSet<_> = topics.iter().collect();
        if unique.len() != topics.len() {
            return Err(ConfigError::DuplicateTopics);
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Total budget for one inbound request, validation included
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One correlated request/response validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Topic the validation requests are published to
    pub request_topic: String,
    /// Topic the backend replies on; also embedded in each request
    pub response_topic: String,
    /// Consumer group for the response subscription
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Upper bound on waiting for one reply
    #[serde(default = "default_validation_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Lifetime of a verified principal in the cache
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,
}

fn default_consumer_group() -> String {
    "gateway-validators".to_string()
}

fn default_validation_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

impl ValidatorConfig {
    /// Defaults for merchant API-key validation
    pub fn merchant() -> Self {
        Self {
            request_topic: "api-key-validation-request".to_string(),
            response_topic: "api-key-validation-response".to_string(),
            consumer_group: default_consumer_group(),
            timeout: default_validation_timeout(),
            cache_ttl: Duration::from_secs(10 * 60),
        }
    }

    /// Defaults for user role validation
    pub fn role() -> Self {
        Self {
            request_topic: "role-validation-request".to_string(),
            response_topic: "role-validation-response".to_string(),
            consumer_group: default_consumer_group(),
            timeout: default_validation_timeout(),
            cache_ttl: default_cache_ttl(),
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.request_topic.trim().is_empty() || self.response_topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic(name));
        }
        if self.request_topic == self.response_topic {
            return Err(ConfigError::SameTopic(name));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(ConfigError::EmptyConsumerGroup(name));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(format!(
                "{name} timeout cannot be 0"
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0}: request and response topics must be set")]
    EmptyTopic(&'static str),

    #[error("{0}: request and response topics must differ")]
    SameTopic(&'static str),

    #[error("{0}: consumer group must be set")]
    EmptyConsumerGroup(&'static str),

    #[error("validators must not share topics")]
    DuplicateTopics,

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
