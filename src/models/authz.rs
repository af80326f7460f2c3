use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{GuardDecision, Permission, Role};
use crate::events::{Loggable, Severity};

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogEntry {
    #[schema(example = "activity:read:own")]
    pub permission: String,
    #[schema(example = "צפייה בפעילות האישית")]
    pub description: String,
    #[schema(example = "activity")]
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "own")]
    pub scope: Option<String>,
    /// Roles that hold this permission without a custom grant
    pub roles: Vec<String>,
}

impl From<Permission> for CatalogEntry {
    fn from(permission: Permission) -> Self {
        CatalogEntry {
            permission: permission.as_str().to_string(),
            description: permission.description().to_string(),
            resource: permission.resource().to_string(),
            scope: permission.scope().map(str::to_string),
            roles: Role::ALL
                .iter()
                .filter(|role| role.has_permission(permission))
                .map(|role| role.as_str().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RolePermissions {
    #[schema(example = "trainee")]
    pub role: String,
    #[schema(example = "חניך")]
    pub display_name: String,
    pub permissions: Vec<String>,
}

// =============================================================================
// CHECKS
// =============================================================================

/// Either a single `permission`, or an `action` on a `resource`
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    #[schema(example = "question:create")]
    pub permission: Option<String>,
    #[schema(example = "read")]
    pub action: Option<String>,
    #[schema(example = "note")]
    pub resource: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub allowed: bool,
}

// =============================================================================
// EFFECTIVE PERMISSIONS (computed)
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectivePermissions {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub permissions: Vec<EffectivePermission>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectivePermission {
    pub name: String,
    pub description: String,
    /// Source of the permission: "role" or "custom"
    #[schema(example = "role")]
    pub source: String,
}

// =============================================================================
// CUSTOM PERMISSIONS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCustomPermissionsRequest {
    #[schema(example = json!(["question:create", "analytics:read:all"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = "question:create")]
    pub permission: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomPermissions {
    pub user_id: String,
    pub permissions: Vec<String>,
}

impl Loggable for CustomPermissions {
    fn entity_type() -> &'static str { "custom_permissions" }
    fn subject_id(&self) -> String { self.user_id.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct NavigateRequest {
    #[schema(example = "/admin/permissions")]
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NavigateResponse {
    pub path: String,
    #[schema(value_type = String, example = "redirect_to_unauthorized")]
    pub decision: GuardDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/unauthorized")]
    pub redirect_to: Option<String>,
}
