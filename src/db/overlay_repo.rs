use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::authz::{AuthzError, OverlayRepository, Permission, UserId};
use crate::db::row_parsers::parse_permission_tokens;
use crate::utils::utc_now;

/// Custom permissions kept in `users.custom_permissions` as a JSON array
#[derive(Debug, Clone)]
pub struct SqliteOverlayRepository {
    pool: SqlitePool,
}

impl SqliteOverlayRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_error(err: sqlx::Error) -> AuthzError {
    AuthzError::Storage(err.to_string())
}

/// Tokens that are no longer in the catalog are dropped with a warning
fn known_permissions(user_id: &str, tokens: Vec<String>) -> BTreeSet<Permission> {
    tokens
        .into_iter()
        .filter_map(|token| match Permission::parse(&token) {
            Some(permission) => Some(permission),
            None => {
                tracing::warn!(user_id = %user_id, token = %token, "stored permission not in catalog, skipping");
                None
            }
        })
        .collect()
}

#[async_trait]
impl OverlayRepository for SqliteOverlayRepository {
    async fn load_all(&self) -> Result<HashMap<UserId, BTreeSet<Permission>>, AuthzError> {
        let rows = sqlx::query(
            "SELECT id, custom_permissions FROM users \
             WHERE deleted_at IS NULL AND custom_permissions IS NOT NULL AND custom_permissions != '[]'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut overlays = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(storage_error)?;
            let raw: Option<String> = row.try_get("custom_permissions").map_err(storage_error)?;
            let permissions = known_permissions(&id, parse_permission_tokens(raw.as_deref()));
            overlays.insert(UserId::from(id), permissions);
        }

        Ok(overlays)
    }

    async fn save(&self, user_id: &UserId, permissions: &BTreeSet<Permission>) -> Result<(), AuthzError> {
        let tokens: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
        let json = serde_json::to_string(&tokens).map_err(|err| AuthzError::Storage(err.to_string()))?;

        let result = sqlx::query(
            "UPDATE users SET custom_permissions = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(json)
        .bind(utc_now())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthzError::UnknownUser(user_id.clone()));
        }
        Ok(())
    }
}
