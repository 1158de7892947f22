//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Shortest accepted lock lease. Every locked section is a handful of store
/// round trips and must finish well inside the lease; nothing renews it.
pub const MIN_LOCK_LEASE_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Redis URL for the distributed lock provider.
    /// When absent, locks are process-local.
    pub redis_url: Option<String>,

    /// JWT verification
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// Lock acquisition policy shared by every team operation
    pub lock_max_attempts: u32,
    pub lock_lease_ms: u64,
    pub lock_retry_delay_ms: u64,

    /// Origins allowed to make credentialed cross-origin requests
    pub cors_origins: Vec<String>,

    /// Runtime configuration
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),

            lock_max_attempts: parse_or("LOCK_MAX_ATTEMPTS", 10)?,
            lock_lease_ms: parse_or("LOCK_LEASE_MS", 30_000)?,
            lock_retry_delay_ms: parse_or("LOCK_RETRY_DELAY_MS", 0)?,

            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "user_center=debug".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject lock settings that cannot keep team operations exclusive
    pub fn validate(&self) -> Result<()> {
        if self.lock_max_attempts == 0 {
            anyhow::bail!("LOCK_MAX_ATTEMPTS must be at least 1");
        }
        if self.lock_lease_ms < MIN_LOCK_LEASE_MS {
            anyhow::bail!(
                "LOCK_LEASE_MS must be at least {}ms, got {}ms",
                MIN_LOCK_LEASE_MS,
                self.lock_lease_ms
            );
        }
        Ok(())
    }
}

/// Parse a numeric env var, falling back to `default` when unset
fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}

/// Split a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
