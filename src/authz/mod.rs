//! Authorization module - Permission catalog, policy engine and route guard
//!
//! This module implements the role/permission model of the training
//! platform with support for:
//! - A closed catalog of `resource:action[:scope]` permissions
//! - Built-in permission sets for trainee, instructor and admin
//! - Per-user custom grants layered on top of the role
//! - Ownership scoped action checks
//! - Route level gating for client navigation

mod catalog;
mod evaluator;
mod guard;
mod principal;
mod roles;
mod routes;
mod store;
mod sync;

pub use catalog::{describe, Permission};
pub use evaluator::{Authorizer, PolicyEvaluator};
pub use guard::{GuardDecision, RouteGuard, LOGIN_PATH, UNAUTHORIZED_PATH};
pub use principal::{Principal, ResourceContext, UserId};
pub use roles::{role_permissions_for, Role};
pub use routes::{Route, RouteRule, RouteTable, UnlistedRoutePolicy, APP_ROUTES};
pub use store::PermissionStore;
pub use sync::{OverlayRepository, OverlaySync};

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthzMode {
    /// No permission checks (development mode)
    Off,
    /// Log denials but allow requests (testing mode)
    Advisory,
    /// Enforce 403 on denied requests (production mode)
    #[default]
    Strict,
}

impl AuthzMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Some(AuthzMode::Off),
            "advisory" => Some(AuthzMode::Advisory),
            "strict" => Some(AuthzMode::Strict),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("invalid permission(s): {}", .0.join(", "))]
    InvalidPermissions(Vec<String>),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("user not found: {0}")]
    UnknownUser(UserId),
    #[error("permission storage error: {0}")]
    Storage(String),
}
