//! Authorization queries
//!
//! Read-only endpoints the client uses to decide what to render.

use axum::extract::{Path, State};
use axum::Json;

use crate::app::AppState;
use crate::authz::{role_permissions_for, Permission, Role, RouteGuard};
use crate::errors::{AppError, AppResult};
use crate::jwt::{AuthUser, MaybeAuthUser};
use crate::models::authz::{
    CatalogEntry, CheckRequest, CheckResponse, NavigateRequest, NavigateResponse, RolePermissions,
};

#[utoipa::path(
    get,
    path = "/authz/catalog",
    tag = "Authorization",
    responses((status = 200, description = "Every known permission", body = Vec<CatalogEntry>))
)]
pub async fn catalog() -> Json<Vec<CatalogEntry>> {
    Json(Permission::ALL.iter().copied().map(CatalogEntry::from).collect())
}

/// Unknown roles answer with an empty list rather than an error
#[utoipa::path(
    get,
    path = "/authz/roles/{role}/permissions",
    tag = "Authorization",
    params(("role" = String, Path, description = "trainee, instructor or admin")),
    responses((status = 200, description = "Built-in permissions of the role", body = RolePermissions))
)]
pub async fn role_permissions(Path(role): Path<String>) -> Json<RolePermissions> {
    let display_name = Role::parse(&role)
        .map(|r| r.display_name().to_string())
        .unwrap_or_else(|| role.clone());
    let permissions = role_permissions_for(&role)
        .into_iter()
        .map(String::from)
        .collect();

    Json(RolePermissions {
        role,
        display_name,
        permissions,
    })
}

#[utoipa::path(
    post,
    path = "/authz/check",
    tag = "Authorization",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Decision for the caller", body = CheckResponse),
        (status = 400, description = "Neither permission nor action/resource given")
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckRequest>,
) -> AppResult<Json<CheckResponse>> {
    let role = auth.principal.role;
    let user_id = Some(auth.user_id());

    let allowed = match (req.permission.as_deref(), req.action.as_deref(), req.resource.as_deref()) {
        (Some(token), _, _) => state.authz.has_permission_token(role, token, user_id),
        (None, Some(action), Some(resource)) => {
            state.authz.can_perform_action(role, action, resource, req.is_owner, user_id)
        }
        _ => return Err(AppError::bad_request("provide either permission, or action and resource")),
    };

    Ok(Json(CheckResponse { allowed }))
}

#[utoipa::path(
    get,
    path = "/authz/me/permissions",
    tag = "Authorization",
    responses((status = 200, description = "Role and custom permissions of the caller", body = Vec<String>)),
    security(("bearerAuth" = []))
)]
pub async fn my_permissions(State(state): State<AppState>, auth: AuthUser) -> Json<Vec<String>> {
    let permissions = state
        .authz
        .get_user_permissions(auth.principal.role, Some(auth.user_id()));
    Json(permissions.into_iter().map(String::from).collect())
}

/// Anonymous callers are allowed; they only get public pages
#[utoipa::path(
    post,
    path = "/guard/navigate",
    tag = "Authorization",
    request_body = NavigateRequest,
    responses((status = 200, description = "Render or redirect", body = NavigateResponse))
)]
pub async fn navigate(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    Json(req): Json<NavigateRequest>,
) -> Json<NavigateResponse> {
    let guard = RouteGuard::new(state.authz.as_ref(), state.authz.routes());
    let principal = auth.as_ref().map(|auth| &auth.principal);
    let decision = guard.check(principal, &req.path);

    Json(NavigateResponse {
        redirect_to: decision.redirect_to().map(str::to_string),
        path: req.path,
        decision,
    })
}
