use crate::authz::{AuthzMode, UnlistedRoutePolicy};
use crate::errors::AppError;
use crate::jwt::JwtConfig;

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt: JwtConfig,
    pub authz_mode: AuthzMode,
    pub unlisted_routes: UnlistedRoutePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        let authz_mode = match std::env::var("AUTHZ_MODE") {
            Ok(value) => AuthzMode::parse(&value)
                .ok_or_else(|| AppError::configuration(format!("AUTHZ_MODE: unknown mode '{value}'")))?,
            Err(_) => AuthzMode::default(),
        };

        let unlisted_routes = match std::env::var("UNLISTED_ROUTE_POLICY") {
            Ok(value) => UnlistedRoutePolicy::parse(&value).ok_or_else(|| {
                AppError::configuration(format!("UNLISTED_ROUTE_POLICY: unknown policy '{value}'"))
            })?,
            Err(_) => UnlistedRoutePolicy::default(),
        };

        Ok(Self {
            port,
            jwt: JwtConfig::from_env()?,
            authz_mode,
            unlisted_routes,
        })
    }

    /// Settings for tests and tools that do not read the environment
    pub fn with_secret(secret: &str) -> Self {
        Self {
            port: 8000,
            jwt: JwtConfig::new(secret, 24),
            authz_mode: AuthzMode::default(),
            unlisted_routes: UnlistedRoutePolicy::default(),
        }
    }

    pub fn with_authz_mode(mut self, mode: AuthzMode) -> Self {
        self.authz_mode = mode;
        self
    }

    pub fn with_unlisted_routes(mut self, policy: UnlistedRoutePolicy) -> Self {
        self.unlisted_routes = policy;
        self
    }
}

/// Load `.env` from the working directory, falling back to the crate root
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_secret_defaults() {
        let config = AppConfig::with_secret("s3cret");
        assert_eq!(config.port, 8000);
        assert_eq!(config.authz_mode, AuthzMode::Strict);
        assert_eq!(config.unlisted_routes, UnlistedRoutePolicy::Allow);
        assert_eq!(config.jwt.exp_hours, 24);
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::with_secret("s3cret")
            .with_authz_mode(AuthzMode::Advisory)
            .with_unlisted_routes(UnlistedRoutePolicy::Deny);
        assert_eq!(config.authz_mode, AuthzMode::Advisory);
        assert_eq!(config.unlisted_routes, UnlistedRoutePolicy::Deny);
    }
}
