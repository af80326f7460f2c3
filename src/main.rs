use mda_authz::config::{init_tracing, load_env};
use mda_authz::{create_app_with_config, db, docs, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::from_env()?;
    let port = config.port;

    let pool = db::init().await?;
    let app = create_app_with_config(pool, config).await?;

    // OpenAPI document plus Swagger UI at /docs
    let openapi = docs::build_openapi(port)?;
    let app = app.merge(docs::swagger_routes(openapi)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
