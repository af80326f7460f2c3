//! User record queries

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Role, UserId};
use crate::db::row_parsers::db_user_from_row;
use crate::errors::AppError;
use crate::models::user::DbUser;
use crate::utils::utc_now;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, custom_permissions, created_at, updated_at, deleted_at";

pub async fn find_active(pool: &SqlitePool, user_id: &UserId) -> Result<Option<DbUser>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL"
    ))
    .bind(user_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(db_user_from_row).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<DbUser>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?) AND deleted_at IS NULL"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(db_user_from_row).transpose()
}

pub async fn require_active(pool: &SqlitePool, user_id: &UserId) -> Result<DbUser, AppError> {
    find_active(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE lower(email) = lower(?)")
        .bind(email.trim())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<DbUser, AppError> {
    let id = UserId::from(Uuid::new_v4());
    let now = utc_now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, custom_permissions, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, '[]', ?, ?)",
    )
    .bind(id.as_str())
    .bind(name.trim())
    .bind(email.trim())
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| match err {
        // a concurrent registration won the race past `email_taken`
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict("email already in use"),
        other => AppError::from(other),
    })?;

    require_active(pool, &id).await
}

/// Returns false when no active user has this id
pub async fn update_role(pool: &SqlitePool, user_id: &UserId, role: Role) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(role.as_str())
        .bind(utc_now())
        .bind(user_id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Soft delete; custom grants are cleared with the record
pub async fn soft_delete(pool: &SqlitePool, user_id: &UserId) -> Result<bool, AppError> {
    let now = utc_now();
    let result = sqlx::query(
        "UPDATE users SET deleted_at = ?, updated_at = ?, custom_permissions = '[]' WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(user_id.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
