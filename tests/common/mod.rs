#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use mda_authz::{create_app_with_config, AppConfig};

pub struct TestApp {
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
    pub pool: SqlitePool,
    pub app: Router,
}

pub async fn migrated_pool(dir: &TempDir) -> Result<SqlitePool> {
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;
    Ok(pool)
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(AppConfig::with_secret("test-secret")).await
}

pub async fn spawn_app_with(config: AppConfig) -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let pool = migrated_pool(&dir).await?;
    let app = create_app_with_config(pool.clone(), config).await?;
    Ok(TestApp { _dir: dir, pool, app })
}

impl TestApp {
    /// Builds a fresh router over the same database, as a restarted server would
    pub async fn restart(&mut self) -> Result<()> {
        self.app = create_app_with_config(self.pool.clone(), AppConfig::with_secret("test-secret")).await?;
        Ok(())
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, value))
    }

    /// Registers a trainee and returns (token, user id)
    pub async fn register(&self, name: &str, email: &str) -> Result<(String, String)> {
        let body = serde_json::json!({ "name": name, "email": email, "password": "password123" });
        let (status, value) = self.request("POST", "/auth/register", None, Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", value);

        let token = value["token"].as_str().context("missing token")?.to_string();
        let id = value["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, id))
    }

    pub async fn set_role(&self, user_id: &str, role: &str) -> Result<()> {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Registers a user and promotes them to admin directly in the database
    pub async fn admin(&self) -> Result<(String, String)> {
        let (token, id) = self.register("מנהל", "admin@example.com").await?;
        self.set_role(&id, "admin").await?;
        Ok((token, id))
    }
}
