//! # Runtime Configuration
//!
//! Everything the binary needs: the validation engine settings, logging and
//! the seed data for the in-process merchant and role services.
//!
//! Loading order: defaults, then the JSON file named by `PG_GATEWAY_CONFIG`
//! (if set), then individual `PG_GATEWAY_*` variables.

use crate::handlers::{MerchantDirectory, RoleDirectory};
use gateway_telemetry::LogConfig;
use pg_api_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Validation engine configuration.
    pub gateway: GatewayConfig,
    /// Log output configuration.
    pub log: LogConfig,
    /// Seed data for the in-process backend services.
    pub directory: DirectoryConfig,
}

/// Seed data for the in-process merchant and role services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub merchants: Vec<MerchantSeed>,
    pub users: Vec<UserSeed>,
    /// Latency added to every backend reply
    #[serde(with = "humantime_serde")]
    pub reply_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantSeed {
    pub api_key: String,
    pub merchant_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub user_id: i64,
    pub roles: Vec<String>,
}

impl DirectoryConfig {
    /// One merchant and one admin for local runs.
    pub fn demo() -> Self {
        Self {
            merchants: vec![MerchantSeed {
                api_key: "sk_test_demo_merchant".to_string(),
                merchant_id: 1001,
            }],
            users: vec![
                UserSeed {
                    user_id: 1,
                    roles: vec!["ADMIN".to_string()],
                },
                UserSeed {
                    user_id: 2,
                    roles: vec!["FINANCE".to_string()],
                },
            ],
            reply_delay: Duration::ZERO,
        }
    }

    pub fn merchant_directory(&self) -> MerchantDirectory {
        self.merchants
            .iter()
            .fold(MerchantDirectory::new(), |directory, seed| {
                directory.with_key(seed.api_key.clone(), seed.merchant_id)
            })
    }

    pub fn role_directory(&self) -> RoleDirectory {
        self.users.iter().fold(RoleDirectory::new(), |directory, seed| {
            directory.with_user(seed.user_id, seed.roles.iter().cloned())
        })
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `PG_GATEWAY_CONFIG`: JSON config file
    /// - `PG_GATEWAY_HOST`, `PG_GATEWAY_PORT`: HTTP bind address
    /// - `PG_GATEWAY_REQUEST_TIMEOUT_MS`: inbound request budget
    /// - `PG_GATEWAY_VALIDATION_TIMEOUT_MS`: reply wait for both validators
    /// - `PG_GATEWAY_CONSUMER_GROUP`: response consumer group for both validators
    /// - `PG_GATEWAY_MERCHANT_CACHE_TTL_SECS`, `PG_GATEWAY_ROLE_CACHE_TTL_SECS`
    /// - `PG_GATEWAY_DEMO`: seed the demo merchant and users (default: false)
    /// - logging variables when no config file is given, see [`LogConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigLoadError> {
        let mut config = match lookup("PG_GATEWAY_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self {
                log: LogConfig::from_lookup(&lookup),
                ..Self::default()
            },
        };
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, ConfigLoadError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigLoadError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigLoadError::Parse { path, source })
    }

    fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigLoadError> {
        let gateway = &mut self.gateway;

        if let Some(host) = parse_var(lookup, "PG_GATEWAY_HOST")? {
            gateway.http.host = host;
        }
        if let Some(port) = parse_var(lookup, "PG_GATEWAY_PORT")? {
            gateway.http.port = port;
        }
        if let Some(ms) = parse_var::<u64>(lookup, "PG_GATEWAY_REQUEST_TIMEOUT_MS")? {
            gateway.http.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(lookup, "PG_GATEWAY_VALIDATION_TIMEOUT_MS")? {
            gateway.merchant_validator.timeout = Duration::from_millis(ms);
            gateway.role_validator.timeout = Duration::from_millis(ms);
        }
        if let Some(group) = lookup("PG_GATEWAY_CONSUMER_GROUP") {
            gateway.merchant_validator.consumer_group = group.clone();
            gateway.role_validator.consumer_group = group;
        }
        if let Some(secs) = parse_var::<u64>(lookup, "PG_GATEWAY_MERCHANT_CACHE_TTL_SECS")? {
            gateway.merchant_validator.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(lookup, "PG_GATEWAY_ROLE_CACHE_TTL_SECS")? {
            gateway.role_validator.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(demo) = lookup("PG_GATEWAY_DEMO") {
            if demo.eq_ignore_ascii_case("true") || demo == "1" {
                self.directory = DirectoryConfig::demo();
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigLoadError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigLoadError::InvalidVar { name, value }),
    }
}
