use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{Authorizer, AuthzMode, OverlaySync, PermissionStore, RouteTable};
use crate::config::AppConfig;
use crate::db::overlay_repo::SqliteOverlayRepository;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{auth, authz, health, users};

pub type OverlayService = OverlaySync<SqliteOverlayRepository>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authz: Arc<Authorizer>,
    pub overlay: Arc<OverlayService>,
    pub event_bus: EventBus,
    pub mode: AuthzMode,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig, event_bus: EventBus) -> Self {
        let store = Arc::new(PermissionStore::new());
        let routes = RouteTable::default().with_unlisted_policy(config.unlisted_routes);
        let authz = Authorizer::new(Arc::clone(&store)).with_routes(routes);
        let overlay = OverlaySync::new(store, SqliteOverlayRepository::new(pool.clone()));

        Self {
            pool,
            jwt: Arc::new(config.jwt.clone()),
            authz: Arc::new(authz),
            overlay: Arc::new(overlay),
            event_bus,
            mode: config.authz_mode,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    create_app_with_config(pool, config).await
}

pub async fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Result<Router, AppError> {
    let (event_bus, event_rx) = init_event_bus();
    let state = AppState::new(pool.clone(), &config, event_bus);

    // session start: the persisted overlays are loaded once, then kept in sync
    state.overlay.hydrate().await?;
    tokio::spawn(start_activity_listener(event_rx, pool));

    if state.mode != AuthzMode::Strict {
        tracing::warn!(mode = ?state.mode, "authorization is not enforced on admin endpoints");
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let authz_routes = Router::new()
        .route("/catalog", get(authz::catalog))
        .route("/roles/:role/permissions", get(authz::role_permissions))
        .route("/check", post(authz::check))
        .route("/me/permissions", get(authz::my_permissions));

    let user_routes = Router::new()
        .route("/:id", delete(users::delete_user))
        .route("/:id/role", put(users::update_role))
        .route("/:id/permissions", get(users::effective_permissions))
        .route(
            "/:id/custom-permissions",
            get(users::get_custom_permissions)
                .put(users::set_custom_permissions)
                .post(users::grant_custom_permission),
        )
        .route("/:id/custom-permissions/:permission", delete(users::revoke_custom_permission));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/guard/navigate", post(authz::navigate))
        .nest("/auth", auth_routes)
        .nest("/authz", authz_routes)
        .nest("/users", user_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
