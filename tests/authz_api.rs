use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn catalog_lists_every_permission_with_roles() -> Result<()> {
    let app = common::spawn_app().await?;

    let (status, v) = app.request("GET", "/authz/catalog", None, None).await?;
    assert_eq!(status, StatusCode::OK);

    let entries = v.as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), mda_authz::authz::Permission::ALL.len());

    let create = entries
        .iter()
        .find(|e| e["permission"] == "question:create")
        .expect("question:create in catalog");
    assert_eq!(create["description"], "יצירת שאלות");
    assert_eq!(create["resource"], "question");
    let roles: Vec<&str> = create["roles"].as_array().unwrap().iter().filter_map(|r| r.as_str()).collect();
    assert!(roles.contains(&"instructor"));
    assert!(roles.contains(&"admin"));
    assert!(!roles.contains(&"trainee"));

    Ok(())
}

#[tokio::test]
async fn role_permissions_endpoint_handles_unknown_roles() -> Result<()> {
    let app = common::spawn_app().await?;

    let (status, v) = app.request("GET", "/authz/roles/trainee/permissions", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    let perms = v["permissions"].as_array().unwrap();
    assert!(perms.iter().any(|p| p == "question:read"));
    assert!(!perms.iter().any(|p| p == "question:create"));

    let (status, v) = app.request("GET", "/authz/roles/superuser/permissions", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["permissions"].as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn check_evaluates_for_the_caller() -> Result<()> {
    let app = common::spawn_app().await?;
    let (token, _) = app.register("נועה", "noa@example.com").await?;

    let (status, v) = app
        .request("POST", "/authz/check", Some(&token), Some(json!({ "permission": "question:read" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["allowed"], true);

    let (_, v) = app
        .request("POST", "/authz/check", Some(&token), Some(json!({ "permission": "question:create" })))
        .await?;
    assert_eq!(v["allowed"], false);

    // unknown tokens are a plain deny, not an error
    let (status, v) = app
        .request("POST", "/authz/check", Some(&token), Some(json!({ "permission": "question:fly" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["allowed"], false);

    // ownership-scoped action
    let (_, v) = app
        .request(
            "POST",
            "/authz/check",
            Some(&token),
            Some(json!({ "action": "read", "resource": "note", "is_owner": true })),
        )
        .await?;
    assert_eq!(v["allowed"], true);

    let (_, v) = app
        .request(
            "POST",
            "/authz/check",
            Some(&token),
            Some(json!({ "action": "read", "resource": "note", "is_owner": false })),
        )
        .await?;
    assert_eq!(v["allowed"], false);

    let (status, _) = app.request("POST", "/authz/check", Some(&token), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn check_requires_a_token() -> Result<()> {
    let app = common::spawn_app().await?;

    let (status, _) = app
        .request("POST", "/authz/check", None, Some(json!({ "permission": "question:read" })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn unknown_stored_role_denies_everything() -> Result<()> {
    let app = common::spawn_app().await?;
    let (token, id) = app.register("דני", "dani@example.com").await?;
    app.set_role(&id, "guest").await?;

    let (_, v) = app
        .request("POST", "/authz/check", Some(&token), Some(json!({ "permission": "question:read" })))
        .await?;
    assert_eq!(v["allowed"], false);

    let (_, v) = app.request("GET", "/authz/me/permissions", Some(&token), None).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(0));

    let (_, v) = app.request("GET", "/auth/me", Some(&token), None).await?;
    assert!(v["role"].is_null());

    Ok(())
}

#[tokio::test]
async fn my_permissions_follow_role_changes() -> Result<()> {
    let app = common::spawn_app().await?;
    let (token, id) = app.register("רוני", "roni@example.com").await?;

    let (_, v) = app.request("GET", "/authz/me/permissions", Some(&token), None).await?;
    let trainee_count = v.as_array().map(Vec::len).unwrap_or(0);
    assert!(trainee_count > 0);

    app.set_role(&id, "instructor").await?;
    let (_, v) = app.request("GET", "/authz/me/permissions", Some(&token), None).await?;
    let perms = v.as_array().unwrap();
    assert!(perms.len() > trainee_count);
    assert!(perms.iter().any(|p| p == "question:create"));

    Ok(())
}
