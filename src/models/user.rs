use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{Role, UserId};
use crate::errors::AppError;
use crate::events::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `null` when the stored role is not one the platform knows
    #[schema(value_type = Option<String>, example = "trainee")]
    pub role: Option<Role>,
    #[schema(example = json!(["question:create"]))]
    pub custom_permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for User {
    fn entity_type() -> &'static str { "user" }
    fn subject_id(&self) -> String { self.id.clone() }
}

#[derive(Debug, Clone)]
pub struct DbUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub custom_permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DbUser {
    pub fn user_id(&self) -> UserId {
        UserId::from(self.id.as_str())
    }

    /// Unknown role names resolve to `None`, which denies everything
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        if value.deleted_at.is_some() {
            return Err(AppError::not_found("user has been deleted"));
        }

        Ok(User {
            role: value.role(),
            id: value.id,
            name: value.name,
            email: value.email,
            custom_permissions: value.custom_permissions,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "נועה כהן")]
    pub name: String,
    #[schema(example = "noa@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "noa@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "instructor")]
    pub role: String,
}

/// Audit record for role changes
#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
    pub user_id: String,
    pub role: Role,
}

impl Loggable for RoleChange {
    fn entity_type() -> &'static str { "user_role" }
    fn subject_id(&self) -> String { self.user_id.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}
