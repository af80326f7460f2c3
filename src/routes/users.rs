//! User administration: roles, custom permissions and deletion.
//! Every change is logged to the activity log with Critical severity.

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::app::AppState;
use crate::authz::{Permission, Role, UserId};
use crate::db::users;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, RequestContext};
use crate::jwt::AuthUser;
use crate::models::authz::{
    CustomPermissions, EffectivePermission, EffectivePermissions, GrantPermissionRequest,
    SetCustomPermissionsRequest,
};
use crate::models::user::{RoleChange, UpdateRoleRequest, User};
use crate::routes::ensure_permission;

fn custom_permissions(user_id: &UserId, permissions: &BTreeSet<Permission>) -> CustomPermissions {
    CustomPermissions {
        user_id: user_id.to_string(),
        permissions: permissions.iter().map(|p| p.as_str().to_string()).collect(),
    }
}

/// Users may always look at their own permissions
#[utoipa::path(
    get,
    path = "/users/{id}/permissions",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Effective permissions by source", body = EffectivePermissions),
        (status = 403, description = "Not allowed to view other users"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<EffectivePermissions>> {
    let user_id = UserId::from(id);
    if &user_id != auth.user_id() {
        ensure_permission(&state, &auth, Permission::UserRead)?;
    }

    let db_user = users::require_active(&state.pool, &user_id).await?;
    let role = db_user.role();

    let permissions = state
        .authz
        .get_user_permissions(role, Some(&user_id))
        .into_iter()
        .map(|permission| {
            let from_role = role.map(|r| r.has_permission(permission)).unwrap_or(false);
            EffectivePermission {
                name: permission.as_str().to_string(),
                description: permission.description().to_string(),
                source: if from_role { "role" } else { "custom" }.to_string(),
            }
        })
        .collect();

    Ok(Json(EffectivePermissions {
        user_id: user_id.to_string(),
        role: role.map(|r| r.as_str().to_string()),
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}/custom-permissions",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Custom grants of the user", body = CustomPermissions),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_custom_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<CustomPermissions>> {
    ensure_permission(&state, &auth, Permission::UserManagePermissions)?;
    let user_id = UserId::from(id);
    users::require_active(&state.pool, &user_id).await?;

    let permissions = state.authz.store().get_custom_permissions(&user_id);
    Ok(Json(custom_permissions(&user_id, &permissions)))
}

/// Replaces the whole list. A single unknown token rejects the request.
#[utoipa::path(
    put,
    path = "/users/{id}/custom-permissions",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    request_body = SetCustomPermissionsRequest,
    responses(
        (status = 200, description = "Custom grants replaced", body = CustomPermissions),
        (status = 400, description = "Unknown permission token(s)"),
        (status = 403, description = "Missing user:manage_permissions"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_custom_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetCustomPermissionsRequest>,
) -> AppResult<Json<CustomPermissions>> {
    ensure_permission(&state, &auth, Permission::UserManagePermissions)?;
    let user_id = UserId::from(id);
    users::require_active(&state.pool, &user_id).await?;

    let before = custom_permissions(&user_id, &state.authz.store().get_custom_permissions(&user_id));
    let after = state.overlay.set(&user_id, &req.permissions).await?;
    let after = custom_permissions(&user_id, &after);

    log_activity(
        &state.event_bus,
        "updated",
        Some(auth.user_id().to_string()),
        &after,
        Some(&before),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(after))
}

#[utoipa::path(
    post,
    path = "/users/{id}/custom-permissions",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Permission granted", body = CustomPermissions),
        (status = 400, description = "Unknown permission token"),
        (status = 403, description = "Missing user:manage_permissions"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_custom_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<Json<CustomPermissions>> {
    ensure_permission(&state, &auth, Permission::UserManagePermissions)?;
    let user_id = UserId::from(id);
    users::require_active(&state.pool, &user_id).await?;

    let after = state.overlay.add(&user_id, &req.permission).await?;
    let after = custom_permissions(&user_id, &after);

    log_activity(
        &state.event_bus,
        "granted",
        Some(auth.user_id().to_string()),
        &after,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(after))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/custom-permissions/{permission}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "User ID"),
        ("permission" = String, Path, description = "Permission token"),
    ),
    responses(
        (status = 200, description = "Permission revoked (or was not granted)", body = CustomPermissions),
        (status = 403, description = "Missing user:manage_permissions"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_custom_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, permission)): Path<(String, String)>,
) -> AppResult<Json<CustomPermissions>> {
    ensure_permission(&state, &auth, Permission::UserManagePermissions)?;
    let user_id = UserId::from(id);
    users::require_active(&state.pool, &user_id).await?;

    let before = state.authz.store().get_custom_permissions(&user_id);
    let after = state.overlay.remove(&user_id, &permission).await?;

    if after != before {
        log_activity(
            &state.event_bus,
            "revoked",
            Some(auth.user_id().to_string()),
            &custom_permissions(&user_id, &after),
            Some(&custom_permissions(&user_id, &before)),
            Some(RequestContext::from_headers(&headers)),
        );
    }

    Ok(Json(custom_permissions(&user_id, &after)))
}

#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Missing user:manage_roles"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<Json<User>> {
    ensure_permission(&state, &auth, Permission::UserManageRoles)?;
    let role: Role = req.role.parse()?;
    let user_id = UserId::from(id);

    if !users::update_role(&state.pool, &user_id, role).await? {
        return Err(AppError::not_found("user not found"));
    }
    tracing::info!(user_id = %user_id, role = %role, "role updated");

    log_activity(
        &state.event_bus,
        "updated",
        Some(auth.user_id().to_string()),
        &RoleChange { user_id: user_id.to_string(), role },
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    let db_user = users::require_active(&state.pool, &user_id).await?;
    Ok(Json(db_user.try_into()?))
}

/// Soft-deletes the user and drops their custom grants from memory
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Missing user:delete"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    ensure_permission(&state, &auth, Permission::UserDelete)?;
    let user_id = UserId::from(id);
    let db_user = users::require_active(&state.pool, &user_id).await?;

    if !users::soft_delete(&state.pool, &user_id).await? {
        return Err(AppError::not_found("user not found"));
    }
    state.overlay.forget(&user_id).await;

    let user: User = db_user.try_into()?;
    log_activity(
        &state.event_bus,
        "deleted",
        Some(auth.user_id().to_string()),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}
