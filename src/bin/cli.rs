use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use mda_authz::authz::{
    role_permissions_for, Authorizer, OverlaySync, Permission, PermissionStore, Role, UserId,
};
use mda_authz::config::load_env;
use mda_authz::db::overlay_repo::SqliteOverlayRepository;
use mda_authz::db::users;
use mda_authz::models::user::DbUser;

#[derive(Parser, Debug)]
#[command(author, version, about = "mda-authz operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// List every permission with its description
    Catalog,
    /// List the built-in permissions of a role
    RolePermissions { role: String },
    /// Evaluate a permission for a role, optionally including a user's custom grants
    Check {
        #[arg(long)]
        role: String,
        #[arg(long)]
        permission: String,
        /// Email of the user whose custom grants should be included
        #[arg(long)]
        user: Option<String>,
    },
    /// Change a user's role
    SetRole { email: String, role: String },
    /// Grant a custom permission to a user
    Grant { email: String, permission: String },
    /// Revoke a custom permission from a user
    Revoke { email: String, permission: String },
    /// Replace a user's custom permissions (no permissions clears them)
    SetPermissions { email: String, permissions: Vec<String> },
    /// Show a user's custom permissions
    CustomPermissions { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::Catalog => {
            for permission in Permission::ALL {
                println!("{:<28} {}", permission.as_str(), permission.description());
            }
        }
        Commands::RolePermissions { role } => {
            let permissions = role_permissions_for(&role);
            if permissions.is_empty() {
                println!("no permissions for role '{}'", role);
            }
            for permission in permissions {
                println!("{}", permission);
            }
        }
        Commands::Check { role, permission, user } => {
            let store = Arc::new(PermissionStore::new());
            let authz = Authorizer::new(Arc::clone(&store));

            let user_id = match user {
                Some(email) => {
                    let pool = get_pool().await?;
                    let db_user = find_user(&pool, &email).await?;
                    OverlaySync::new(store, SqliteOverlayRepository::new(pool)).hydrate().await?;
                    Some(db_user.user_id())
                }
                None => None,
            };

            println!("{}", decision(&authz, &role, &permission, user_id.as_ref()));
        }
        Commands::SetRole { email, role } => {
            let role: Role = role.parse()?;
            let pool = get_pool().await?;
            let db_user = find_user(&pool, &email).await?;
            users::update_role(&pool, &db_user.user_id(), role).await?;
            println!("{} is now {}", email, role);
        }
        Commands::Grant { email, permission } => {
            let (sync, db_user) = overlay_for(&email).await?;
            let now = sync.add(&db_user.user_id(), &permission).await?;
            print_permissions(&email, now.iter());
        }
        Commands::Revoke { email, permission } => {
            let (sync, db_user) = overlay_for(&email).await?;
            let now = sync.remove(&db_user.user_id(), &permission).await?;
            print_permissions(&email, now.iter());
        }
        Commands::SetPermissions { email, permissions } => {
            let (sync, db_user) = overlay_for(&email).await?;
            let now = sync.set(&db_user.user_id(), &permissions).await?;
            print_permissions(&email, now.iter());
        }
        Commands::CustomPermissions { email } => {
            let (sync, db_user) = overlay_for(&email).await?;
            let now = sync.store().get_custom_permissions(&db_user.user_id());
            print_permissions(&email, now.iter());
        }
    }

    Ok(())
}

/// Unknown roles and tokens evaluate to deny rather than failing
fn decision(authz: &Authorizer, role: &str, permission: &str, user_id: Option<&UserId>) -> &'static str {
    if authz.has_permission_token(Role::parse(role), permission, user_id) {
        "allow"
    } else {
        "deny"
    }
}

fn print_permissions<'a>(email: &str, permissions: impl Iterator<Item = &'a Permission>) {
    let tokens: Vec<&str> = permissions.map(Permission::as_str).collect();
    if tokens.is_empty() {
        println!("{}: no custom permissions", email);
    } else {
        println!("{}: {}", email, tokens.join(", "));
    }
}

async fn find_user(pool: &SqlitePool, email: &str) -> anyhow::Result<DbUser> {
    users::find_by_email(pool, email)
        .await?
        .with_context(|| format!("no active user with email {}", email))
}

async fn overlay_for(email: &str) -> anyhow::Result<(OverlaySync<SqliteOverlayRepository>, DbUser)> {
    let pool = get_pool().await?;
    let db_user = find_user(&pool, email).await?;
    let sync = OverlaySync::new(Arc::new(PermissionStore::new()), SqliteOverlayRepository::new(pool));
    sync.hydrate().await?;
    Ok((sync, db_user))
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let has_table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if has_table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations (repo root), fall back to the crate-local folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
