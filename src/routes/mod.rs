pub mod auth;
pub mod authz;
pub mod health;
pub mod users;

use crate::app::AppState;
use crate::authz::{AuthzMode, Permission, PolicyEvaluator};
use crate::errors::AppError;
use crate::jwt::AuthUser;

/// Gate an admin endpoint on a catalog permission, honouring the
/// configured enforcement mode.
pub(crate) fn ensure_permission(state: &AppState, auth: &AuthUser, permission: Permission) -> Result<(), AppError> {
    if state.mode == AuthzMode::Off {
        return Ok(());
    }

    if state.authz.can(&auth.principal, permission) {
        return Ok(());
    }

    match state.mode {
        AuthzMode::Advisory => {
            tracing::warn!(
                user_id = %auth.user_id(),
                permission = %permission,
                "permission denied (advisory mode, request allowed)"
            );
            Ok(())
        }
        _ => Err(AppError::forbidden(format!("missing permission {permission}"))),
    }
}
