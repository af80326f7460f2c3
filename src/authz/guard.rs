//! Navigation guard
//!
//! Decides, for a navigation attempt, whether the page renders or where the
//! user is sent instead.

use serde::Serialize;

use super::evaluator::PolicyEvaluator;
use super::principal::Principal;
use super::routes::{Route, RouteTable};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    RedirectToLogin,
    RedirectToUnauthorized,
}

impl GuardDecision {
    pub fn redirect_to(&self) -> Option<&'static str> {
        match self {
            Self::Render => None,
            Self::RedirectToLogin => Some(LOGIN_PATH),
            Self::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Render)
    }
}

pub struct RouteGuard<'a, E: PolicyEvaluator> {
    evaluator: &'a E,
    routes: &'a RouteTable,
}

impl<'a, E: PolicyEvaluator> RouteGuard<'a, E> {
    pub fn new(evaluator: &'a E, routes: &'a RouteTable) -> Self {
        Self { evaluator, routes }
    }

    /// Publicity comes from the route table; unknown paths are private
    pub fn resolve(&self, path: &str) -> Route {
        let public = self.routes.lookup(path).map(|rule| rule.public).unwrap_or(false);
        Route {
            path: path.to_string(),
            public,
        }
    }

    pub fn check(&self, principal: Option<&Principal>, path: &str) -> GuardDecision {
        let route = self.resolve(path);
        if route.public {
            return GuardDecision::Render;
        }

        let Some(principal) = principal else {
            tracing::debug!(path = %path, "not signed in, redirecting to login");
            return GuardDecision::RedirectToLogin;
        };

        if self
            .evaluator
            .can_access_route(principal.role, &route, Some(&principal.user_id))
        {
            GuardDecision::Render
        } else {
            tracing::debug!(
                user_id = %principal.user_id,
                path = %path,
                "route denied, redirecting to unauthorized"
            );
            GuardDecision::RedirectToUnauthorized
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::authz::{Authorizer, PermissionStore, Role};

    fn check(authz: &Authorizer, principal: Option<&Principal>, path: &str) -> GuardDecision {
        RouteGuard::new(authz, authz.routes()).check(principal, path)
    }

    #[test]
    fn test_public_page_renders_for_anonymous() {
        let authz = Authorizer::new(Arc::new(PermissionStore::new()));
        assert_eq!(check(&authz, None, "/login"), GuardDecision::Render);
        assert_eq!(check(&authz, None, "/unauthorized"), GuardDecision::Render);
    }

    #[test]
    fn test_anonymous_goes_to_login() {
        let authz = Authorizer::new(Arc::new(PermissionStore::new()));
        let decision = check(&authz, None, "/manager");
        assert_eq!(decision, GuardDecision::RedirectToLogin);
        assert_eq!(decision.redirect_to(), Some(LOGIN_PATH));
        assert_eq!(check(&authz, None, "/not/listed"), GuardDecision::RedirectToLogin);
    }

    #[test]
    fn test_insufficient_role_goes_to_unauthorized() {
        let authz = Authorizer::new(Arc::new(PermissionStore::new()));
        let trainee = Principal::new("t1").with_role(Role::Trainee);
        let admin = Principal::new("a1").with_role(Role::Admin);

        let decision = check(&authz, Some(&trainee), "/admin/permissions");
        assert_eq!(decision, GuardDecision::RedirectToUnauthorized);
        assert_eq!(decision.redirect_to(), Some(UNAUTHORIZED_PATH));

        assert_eq!(check(&authz, Some(&admin), "/admin/permissions"), GuardDecision::Render);
        assert_eq!(check(&authz, Some(&trainee), "/practice"), GuardDecision::Render);
    }

    #[test]
    fn test_principal_without_role_is_unauthorized() {
        let authz = Authorizer::new(Arc::new(PermissionStore::new()));
        let nobody = Principal::new("x");
        assert_eq!(check(&authz, Some(&nobody), "/dashboard"), GuardDecision::RedirectToUnauthorized);
    }

    #[test]
    fn test_custom_grant_opens_page() {
        let authz = Authorizer::new(Arc::new(PermissionStore::new()));
        let trainee = Principal::new("t1").with_role(Role::Trainee);
        authz
            .store()
            .add_custom_permission(&trainee.user_id, "question:create")
            .unwrap();
        assert_eq!(check(&authz, Some(&trainee), "/questions/new"), GuardDecision::Render);
    }
}
