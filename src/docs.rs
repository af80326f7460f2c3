use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::authz::catalog,
		routes::authz::role_permissions,
		routes::authz::check,
		routes::authz::my_permissions,
		routes::authz::navigate,
		routes::users::effective_permissions,
		routes::users::get_custom_permissions,
		routes::users::set_custom_permissions,
		routes::users::grant_custom_permission,
		routes::users::revoke_custom_permission,
		routes::users::update_role,
		routes::users::delete_user
	),
	components(
		schemas(
			routes::health::HealthResponse,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::UpdateRoleRequest,
			models::authz::CatalogEntry,
			models::authz::RolePermissions,
			models::authz::CheckRequest,
			models::authz::CheckResponse,
			models::authz::EffectivePermissions,
			models::authz::EffectivePermission,
			models::authz::SetCustomPermissionsRequest,
			models::authz::GrantPermissionRequest,
			models::authz::CustomPermissions,
			models::authz::NavigateRequest,
			models::authz::NavigateResponse
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Authentication endpoints"),
		(name = "Authorization", description = "Permission catalog, checks and navigation guard"),
		(name = "Users", description = "Role and custom permission administration")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn object_entry<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Map<String, Value>> {
	value
		.as_object_mut()?
		.entry(key.to_string())
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
}

fn ensure_security_components(doc: &mut Value) {
	let Some(components) = object_entry(doc, "components") else { return; };
	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));

	if let Some(schemes) = schemes.as_object_mut() {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("servers")
			.or_insert_with(|| json!([{ "url": format!("http://localhost:{}", port) }]));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_openapi_lists_paths_and_security() {
		let doc = build_openapi(9000).unwrap();
		let value = serde_json::to_value(&doc).unwrap();

		assert!(value["paths"]["/authz/check"]["post"].is_object());
		assert!(value["paths"]["/users/{id}/custom-permissions"]["put"].is_object());
		assert_eq!(value["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(value["servers"][0]["url"], "http://localhost:9000");
	}
}
