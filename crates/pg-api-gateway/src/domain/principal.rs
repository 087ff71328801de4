//! Verified principals placed into request extensions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Merchant behind a verified API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantId(pub i64);

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Roles granted to a verified user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True if at least one of `roles` is granted.
    pub fn any_of<'a>(&self, roles: impl IntoIterator<Item = &'a str>) -> bool {
        roles.into_iter().any(|role| self.contains(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Identity established by the primary (JWT) authentication stage.
///
/// The payload is whatever the token carried; the role validator normalizes
/// it into a user id.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedSubject(pub serde_json::Value);
