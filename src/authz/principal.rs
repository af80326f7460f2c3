use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::roles::Role;

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

/// Principal represents the authenticated user as seen by the evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Option<Role>,
}

impl Principal {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// An `action` on a `resource`, optionally owned by the caller
#[derive(Debug, Clone, Default)]
pub struct ResourceContext {
    pub action: String,
    pub resource: String,
    pub is_owner: bool,
}

impl ResourceContext {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            is_owner: false,
        }
    }

    pub fn owned(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    /// Candidate tokens in evaluation order: owned scope first (only when the
    /// caller owns the resource), then unscoped, then `all`.
    pub fn candidate_tokens(&self) -> Vec<String> {
        let base = format!("{}:{}", self.resource, self.action);
        let mut tokens = Vec::with_capacity(3);
        if self.is_owner {
            tokens.push(format!("{base}:own"));
        }
        let all = format!("{base}:all");
        tokens.push(base);
        tokens.push(all);
        tokens
    }
}
