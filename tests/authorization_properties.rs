//! Properties of the authorization core, exercised through the public API only.

use std::collections::BTreeSet;
use std::sync::Arc;

use mda_authz::authz::{
    describe, role_permissions_for, Authorizer, AuthzError, GuardDecision, Permission, PermissionStore,
    PolicyEvaluator, Principal, Role, Route, RouteGuard, UserId, APP_ROUTES,
};

fn authorizer() -> (Arc<PermissionStore>, Authorizer) {
    let store = Arc::new(PermissionStore::new());
    let authz = Authorizer::new(Arc::clone(&store));
    (store, authz)
}

#[test]
fn role_sets_are_nested_and_admin_holds_everything() {
    let trainee = role_permissions_for("trainee");
    let instructor = role_permissions_for("instructor");
    let admin = role_permissions_for("admin");

    assert!(trainee.is_subset(&instructor));
    assert!(instructor.is_subset(&admin));
    assert_eq!(admin, Permission::ALL.iter().copied().collect::<BTreeSet<_>>());
    assert!(role_permissions_for("").is_empty());
    assert!(role_permissions_for("root").is_empty());
}

#[test]
fn every_catalog_token_parses_back_and_has_a_description() {
    for permission in Permission::ALL {
        assert_eq!(permission.as_str().parse::<Permission>(), Ok(*permission));
        assert_ne!(describe(permission.as_str()), permission.as_str());
    }
    assert_eq!(describe("made:up"), "made:up");
}

#[test]
fn no_role_means_no_access_even_with_custom_grants() {
    let (store, authz) = authorizer();
    let user = UserId::from("u1");
    store.set_custom_permissions(&user, ["question:read"]).unwrap();

    for permission in Permission::ALL {
        assert!(!authz.has_permission(None, *permission, Some(&user)));
    }
    assert!(!authz.can_access_route(None, &Route::new("/dashboard"), Some(&user)));
    assert!(authz.can_access_route(None, &Route::public("/login"), None));
}

#[test]
fn custom_grants_extend_but_never_restrict() {
    let (store, authz) = authorizer();
    let user = UserId::from("u1");
    let before = authz.get_user_permissions(Some(Role::Trainee), Some(&user));

    store.add_custom_permission(&user, "system:backup").unwrap();
    let after = authz.get_user_permissions(Some(Role::Trainee), Some(&user));
    assert!(before.is_subset(&after));
    assert!(authz.has_permission(Some(Role::Trainee), Permission::SystemBackup, Some(&user)));

    // granting something the role already has does not duplicate it
    store.add_custom_permission(&user, "question:read").unwrap();
    let union = authz.get_user_permissions(Some(Role::Trainee), Some(&user));
    assert_eq!(union.len(), before.len() + 1);

    store.remove_custom_permission(&user, "system:backup");
    store.remove_custom_permission(&user, "question:read");
    assert!(store.is_empty());
    assert_eq!(authz.get_user_permissions(Some(Role::Trainee), Some(&user)), before);
}

#[test]
fn invalid_lists_are_rejected_atomically() {
    let store = PermissionStore::new();
    let user = UserId::from("u1");
    store.set_custom_permissions(&user, ["note:create"]).unwrap();

    let err = store
        .set_custom_permissions(&user, ["question:create", "bogus", "also:bogus"])
        .unwrap_err();
    assert_eq!(
        err,
        AuthzError::InvalidPermissions(vec!["bogus".to_string(), "also:bogus".to_string()])
    );
    assert_eq!(
        store.get_custom_permissions(&user),
        BTreeSet::from([Permission::NoteCreate])
    );
}

#[test]
fn ownership_scoped_actions() {
    let (_, authz) = authorizer();
    let trainee = Some(Role::Trainee);

    assert!(authz.can_perform_action(trainee, "read", "note", true, None));
    assert!(!authz.can_perform_action(trainee, "read", "note", false, None));
    assert!(authz.can_perform_action(Some(Role::Instructor), "read", "progress", false, None));
    assert!(!authz.can_perform_action(trainee, "fly", "note", true, None));
}

#[test]
fn guard_decisions_for_every_listed_route() {
    let (_, authz) = authorizer();
    let guard = RouteGuard::new(&authz, authz.routes());
    let admin = Principal::new("a1").with_role(Role::Admin);

    for rule in APP_ROUTES {
        let path = rule.pattern.replace(":id", "7");
        let anonymous = guard.check(None, &path);
        if rule.public {
            assert_eq!(anonymous, GuardDecision::Render, "{}", path);
        } else {
            assert_eq!(anonymous, GuardDecision::RedirectToLogin, "{}", path);
        }
        assert_eq!(guard.check(Some(&admin), &path), GuardDecision::Render, "{}", path);
    }
}
