use std::collections::BTreeSet;
use std::sync::Arc;

use super::catalog::Permission;
use super::principal::{Principal, ResourceContext, UserId};
use super::roles::Role;
use super::routes::{Route, RouteTable, UnlistedRoutePolicy};
use super::store::PermissionStore;

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Check a single catalog permission for a role and optional user
    fn has_permission(&self, role: Option<Role>, permission: Permission, user_id: Option<&UserId>) -> bool;

    /// Check whether a role may open a route
    fn can_access_route(&self, role: Option<Role>, route: &Route, user_id: Option<&UserId>) -> bool;

    /// Check if the principal has permission to perform an action
    fn can(&self, principal: &Principal, permission: Permission) -> bool {
        self.has_permission(principal.role, permission, Some(&principal.user_id))
    }
}

/// Default evaluator combining role permissions with the custom overlay
///
/// Evaluation order:
/// 1. no role -> deny
/// 2. custom grant for the user -> allow
/// 3. role permission -> allow
/// 4. deny
#[derive(Debug, Clone)]
pub struct Authorizer {
    store: Arc<PermissionStore>,
    routes: RouteTable,
}

impl Authorizer {
    pub fn new(store: Arc<PermissionStore>) -> Self {
        Self {
            store,
            routes: RouteTable::default(),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn store(&self) -> &Arc<PermissionStore> {
        &self.store
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Same as `has_permission` for a raw token; empty or unknown tokens deny
    pub fn has_permission_token(&self, role: Option<Role>, token: &str, user_id: Option<&UserId>) -> bool {
        match Permission::parse(token) {
            Some(permission) => self.has_permission(role, permission, user_id),
            None => {
                tracing::debug!(token = %token, "token not in catalog");
                false
            }
        }
    }

    /// Owned scope is tried first, then the unscoped and `all` tokens; any
    /// one of them is enough. Tokens outside the catalog are skipped.
    pub fn can_perform_action(
        &self,
        role: Option<Role>,
        action: &str,
        resource: &str,
        is_owner: bool,
        user_id: Option<&UserId>,
    ) -> bool {
        let ctx = ResourceContext::new(action, resource).owned(is_owner);
        self.can_perform(role, &ctx, user_id)
    }

    pub fn can_perform(&self, role: Option<Role>, ctx: &ResourceContext, user_id: Option<&UserId>) -> bool {
        ctx.candidate_tokens()
            .iter()
            .filter_map(|token| Permission::parse(token))
            .any(|permission| self.has_permission(role, permission, user_id))
    }

    /// Role permissions plus the user's custom grants, de-duplicated
    pub fn get_user_permissions(&self, role: Option<Role>, user_id: Option<&UserId>) -> BTreeSet<Permission> {
        let mut permissions: BTreeSet<Permission> = role
            .map(|role| role.permissions().iter().copied().collect())
            .unwrap_or_default();

        if let Some(user_id) = user_id {
            permissions.extend(self.store.get_custom_permissions(user_id));
        }

        permissions
    }
}

impl PolicyEvaluator for Authorizer {
    fn has_permission(&self, role: Option<Role>, permission: Permission, user_id: Option<&UserId>) -> bool {
        let Some(role) = role else {
            tracing::debug!(permission = %permission, "no role, permission denied");
            return false;
        };

        if let Some(user_id) = user_id {
            if self.store.contains(user_id, permission) {
                tracing::debug!(
                    user_id = %user_id,
                    permission = %permission,
                    "custom permission match"
                );
                return true;
            }
        }

        if role.has_permission(permission) {
            tracing::debug!(role = %role, permission = %permission, "role permission match");
            return true;
        }

        tracing::debug!(role = %role, permission = %permission, "permission denied");
        false
    }

    fn can_access_route(&self, role: Option<Role>, route: &Route, user_id: Option<&UserId>) -> bool {
        if route.public {
            return true;
        }

        if role.is_none() {
            return false;
        }

        match self.routes.lookup(&route.path) {
            Some(rule) => match rule.permission {
                Some(permission) => self.has_permission(role, permission, user_id),
                None => true,
            },
            None => match self.routes.unlisted_policy() {
                UnlistedRoutePolicy::Allow => true,
                UnlistedRoutePolicy::Deny => {
                    tracing::debug!(path = %route.path, "unlisted route denied");
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> Authorizer {
        Authorizer::new(Arc::new(PermissionStore::new()))
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn test_role_membership_decides_without_user() {
        let authz = authorizer();
        for role in Role::ALL {
            for permission in Permission::ALL {
                assert_eq!(
                    authz.has_permission(Some(*role), *permission, None),
                    role.has_permission(*permission),
                    "{} / {}",
                    role,
                    permission
                );
            }
        }
    }

    #[test]
    fn test_admin_holds_every_permission() {
        let authz = authorizer();
        assert!(Permission::ALL
            .iter()
            .all(|p| authz.has_permission(Some(Role::Admin), *p, None)));
    }

    #[test]
    fn test_trainee_question_create_with_and_without_grant() {
        let authz = authorizer();
        let u = user("trainee-1");

        assert!(!authz.has_permission(Some(Role::Trainee), Permission::QuestionCreate, Some(&u)));

        authz.store().add_custom_permission(&u, "question:create").unwrap();
        assert!(authz.has_permission(Some(Role::Trainee), Permission::QuestionCreate, Some(&u)));
        // grants belong to the user, not the role
        assert!(!authz.has_permission(Some(Role::Trainee), Permission::QuestionCreate, Some(&user("other"))));
        assert!(!authz.has_permission(Some(Role::Trainee), Permission::QuestionCreate, None));
    }

    #[test]
    fn test_custom_grant_is_role_independent() {
        let authz = authorizer();
        let u = user("u1");
        authz.store().add_custom_permission(&u, "system:backup").unwrap();

        for role in Role::ALL {
            assert!(authz.has_permission(Some(*role), Permission::SystemBackup, Some(&u)));
        }
    }

    #[test]
    fn test_missing_role_or_token_denies() {
        let authz = authorizer();
        let u = user("u1");
        authz.store().add_custom_permission(&u, "note:create").unwrap();

        assert!(!authz.has_permission(None, Permission::NoteCreate, Some(&u)));
        assert!(!authz.has_permission_token(Some(Role::Admin), "", None));
        assert!(!authz.has_permission_token(Some(Role::Admin), "note:fly", None));
        assert!(authz.has_permission_token(Some(Role::Trainee), "note:create", None));
    }

    #[test]
    fn test_can_perform_action_owner_scope() {
        let authz = authorizer();

        // trainee holds note:read:own only
        assert!(authz.can_perform_action(Some(Role::Trainee), "read", "note", true, None));
        assert!(!authz.can_perform_action(Some(Role::Trainee), "read", "note", false, None));

        // instructors cannot read other users' notes
        assert!(!authz.can_perform_action(Some(Role::Instructor), "read", "note", false, None));
        assert!(authz.can_perform_action(Some(Role::Admin), "read", "note", false, None));
    }

    #[test]
    fn test_can_perform_action_unscoped_and_all() {
        let authz = authorizer();
        assert!(authz.can_perform_action(Some(Role::Instructor), "create", "question", false, None));
        assert!(authz.can_perform_action(Some(Role::Instructor), "read", "progress", false, None));
        assert!(!authz.can_perform_action(Some(Role::Trainee), "read", "progress", false, None));
        assert!(!authz.can_perform_action(Some(Role::Admin), "explode", "question", true, None));
    }

    #[test]
    fn test_can_perform_action_uses_overlay() {
        let authz = authorizer();
        let u = user("u1");
        authz.store().add_custom_permission(&u, "progress:read:all").unwrap();
        assert!(authz.can_perform_action(Some(Role::Trainee), "read", "progress", false, Some(&u)));
    }

    #[test]
    fn test_get_user_permissions_is_union() {
        let authz = authorizer();
        let u = user("u1");
        authz
            .store()
            .set_custom_permissions(&u, ["question:create", "question:read"])
            .unwrap();

        let all = authz.get_user_permissions(Some(Role::Trainee), Some(&u));
        assert!(all.contains(&Permission::QuestionCreate));
        assert!(all.contains(&Permission::QuestionRead));
        assert_eq!(all.len(), Role::Trainee.permissions().len() + 1);

        assert!(authz.get_user_permissions(None, None).is_empty());
        assert_eq!(authz.get_user_permissions(None, Some(&u)).len(), 2);
    }

    #[test]
    fn test_public_routes_open_to_everyone() {
        let authz = authorizer();
        let login = Route::public("/login");
        assert!(authz.can_access_route(None, &login, None));
        for role in Role::ALL {
            assert!(authz.can_access_route(Some(*role), &login, None));
        }
    }

    #[test]
    fn test_private_route_needs_role() {
        let authz = authorizer();
        assert!(!authz.can_access_route(None, &Route::new("/manager"), None));
        assert!(!authz.can_access_route(None, &Route::new("/dashboard"), None));
    }

    #[test]
    fn test_listed_route_checks_permission() {
        let authz = authorizer();
        let manager = Route::new("/manager");
        assert!(!authz.can_access_route(Some(Role::Trainee), &manager, None));
        assert!(!authz.can_access_route(Some(Role::Instructor), &manager, None));
        assert!(authz.can_access_route(Some(Role::Admin), &manager, None));

        let u = user("u1");
        authz.store().add_custom_permission(&u, "system:settings").unwrap();
        assert!(authz.can_access_route(Some(Role::Trainee), &manager, Some(&u)));
    }

    #[test]
    fn test_unlisted_route_policy() {
        let open = authorizer();
        assert!(open.can_access_route(Some(Role::Trainee), &Route::new("/somewhere/else"), None));

        let closed = authorizer()
            .with_routes(RouteTable::default().with_unlisted_policy(UnlistedRoutePolicy::Deny));
        assert!(!closed.can_access_route(Some(Role::Admin), &Route::new("/somewhere/else"), None));
        assert!(closed.can_access_route(Some(Role::Trainee), &Route::new("/dashboard"), None));
    }

    #[test]
    fn test_decisions_are_repeatable() {
        let authz = authorizer();
        let route = Route::new("/admin/statistics");
        let first = authz.can_access_route(Some(Role::Instructor), &route, None);
        for _ in 0..10 {
            assert_eq!(authz.can_access_route(Some(Role::Instructor), &route, None), first);
        }
    }

    #[test]
    fn test_can_uses_principal() {
        let authz = authorizer();
        let principal = Principal::new("u9").with_role(Role::Trainee);
        assert!(!authz.can(&principal, Permission::PlanAssign));

        authz.store().add_custom_permission(&principal.user_id, "plan:assign").unwrap();
        assert!(authz.can(&principal, Permission::PlanAssign));
    }
}
