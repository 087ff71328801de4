//! Lookup tables answering validation requests.

use pg_api_gateway::domain::messages::{
    ApiKeyValidationRequest, ApiKeyValidationResponse, CorrelatedRequest, RoleValidationRequest,
    RoleValidationResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// Source of truth for one kind of validation request.
pub trait SubjectDirectory: Send + Sync + 'static {
    /// Short name used in logs
    const NAME: &'static str;

    type Request: DeserializeOwned + CorrelatedRequest + Send;
    type Reply: Serialize + Send + 'static;

    fn answer(&self, request: &Self::Request) -> Self::Reply;
}

/// API key table: key -> merchant id.
#[derive(Debug, Clone, Default)]
pub struct MerchantDirectory {
    keys: HashMap<String, i64>,
}

impl MerchantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, api_key: impl Into<String>, merchant_id: i64) -> Self {
        self.insert(api_key, merchant_id);
        self
    }

    pub fn insert(&mut self, api_key: impl Into<String>, merchant_id: i64) {
        self.keys.insert(api_key.into(), merchant_id);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl SubjectDirectory for MerchantDirectory {
    const NAME: &'static str = "merchant-service";

    type Request = ApiKeyValidationRequest;
    type Reply = ApiKeyValidationResponse;

    fn answer(&self, request: &ApiKeyValidationRequest) -> ApiKeyValidationResponse {
        match self.keys.get(&request.api_key) {
            Some(&merchant_id) => ApiKeyValidationResponse {
                correlation_id: request.correlation_id,
                valid: true,
                merchant_id,
            },
            None => ApiKeyValidationResponse {
                correlation_id: request.correlation_id,
                valid: false,
                merchant_id: 0,
            },
        }
    }
}

/// Role table: user id -> role names.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    roles: HashMap<i64, Vec<String>>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<I, S>(mut self, user_id: i64, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(user_id, roles);
        self
    }

    pub fn insert<I, S>(&mut self, user_id: i64, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .insert(user_id, roles.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl SubjectDirectory for RoleDirectory {
    const NAME: &'static str = "role-service";

    type Request = RoleValidationRequest;
    type Reply = RoleValidationResponse;

    fn answer(&self, request: &RoleValidationRequest) -> RoleValidationResponse {
        let role_names = self
            .roles
            .get(&request.user_id)
            .cloned()
            .unwrap_or_default();

        RoleValidationResponse {
            correlation_id: request.correlation_id,
            valid: !role_names.is_empty(),
            role_names,
        }
    }
}
