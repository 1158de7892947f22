//! User center application composition root
//!
//! Wires configuration into the lock provider, stores, and auth backend, and
//! composes the domain routers into a single application.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use user_center_auth::{AuthBackend, AuthConfig};
use user_center_common::config::Config;
use user_center_lock::{
    InMemoryLockProvider, LockManager, LockPolicy, LockProvider, RedisLockConfig,
    RedisLockProvider,
};
use user_center_teams::{TeamService, TeamsRepositories, TeamsState};

/// Create the main application router backed by Postgres
pub async fn create_app(config: Config, pool: PgPool) -> Result<Router, anyhow::Error> {
    let provider = lock_provider(&config).await?;
    let locks = LockManager::new(provider, lock_policy(&config));

    let teams_state = TeamsState::new(
        TeamService::new(TeamsRepositories::new(pool), locks),
        AuthBackend::new(auth_config(&config)),
    );

    Ok(build_router(teams_state))
}

/// Compose domain routers with shared infrastructure routes
pub fn build_router(teams_state: TeamsState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { concat!("User Center API v", env!("CARGO_PKG_VERSION")) }),
        )
        .merge(user_center_teams::routes().with_state(teams_state))
}

/// Redis when `REDIS_URL` is set, otherwise process-local locks
pub async fn lock_provider(config: &Config) -> Result<Arc<dyn LockProvider>, anyhow::Error> {
    match &config.redis_url {
        Some(url) => {
            let provider = RedisLockProvider::new(RedisLockConfig::new(url.clone()))
                .await
                .map_err(|e| anyhow::anyhow!("Redis lock provider unavailable: {}", e))?;
            tracing::info!("Using Redis lock provider");
            Ok(Arc::new(provider))
        }
        None => {
            tracing::warn!("REDIS_URL not set; team locks are local to this process");
            Ok(Arc::new(InMemoryLockProvider::new()))
        }
    }
}

pub fn lock_policy(config: &Config) -> LockPolicy {
    LockPolicy::default()
        .with_max_attempts(config.lock_max_attempts)
        .with_lease(Duration::from_millis(config.lock_lease_ms))
        .with_retry_delay(Duration::from_millis(config.lock_retry_delay_ms))
}

pub fn auth_config(config: &Config) -> AuthConfig {
    AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        issuer: config.jwt_issuer.clone(),
        audience: config.jwt_audience.clone(),
    }
}

/// Credentialed CORS for the configured origins; permissive when none are set
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, anyhow::Error> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin {}: {}", origin, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
