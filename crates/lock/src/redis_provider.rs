//! Redis lock provider
//!
//! Each lock is a single key holding the owner's token with a millisecond
//! expiry (`SET NX PX`). Release and renew compare the token server-side so a
//! holder whose lease already lapsed can never touch a successor's lock.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use crate::{LockError, LockKey, LockProvider};

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

/// Configuration for the Redis lock provider
#[derive(Debug, Clone)]
pub struct RedisLockConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Optional prefix prepended to every lock key
    pub key_prefix: Option<String>,
}

impl RedisLockConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

#[derive(Clone)]
pub struct RedisLockProvider {
    connection: ConnectionManager,
    config: RedisLockConfig,
    release_script: Script,
    renew_script: Script,
}

impl fmt::Debug for RedisLockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLockProvider")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisLockProvider {
    pub async fn new(config: RedisLockConfig) -> Result<Self, LockError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| LockError::Backend(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            release_script: Script::new(RELEASE_SCRIPT),
            renew_script: Script::new(RENEW_SCRIPT),
        })
    }

    fn redis_key(&self, key: &LockKey) -> String {
        prefixed(self.config.key_prefix.as_deref(), key)
    }
}

fn prefixed(prefix: Option<&str>, key: &LockKey) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

fn lease_millis(lease: Duration) -> u64 {
    (lease.as_millis() as u64).max(1)
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(lease_millis(lease))
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to acquire '{}': {}", key, e)))?;

        // Redis answers "OK" when the key was set, nil when it already existed
        Ok(result.is_some())
    }

    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = self
            .release_script
            .key(self.redis_key(key))
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to release '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn renew(
        &self,
        key: &LockKey,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let mut conn = self.connection.clone();

        let renewed: i64 = self
            .renew_script
            .key(self.redis_key(key))
            .arg(token)
            .arg(lease_millis(lease))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to renew '{}': {}", key, e)))?;

        Ok(renewed > 0)
    }

    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let mut conn = self.connection.clone();

        let current: Option<String> = conn
            .get(self.redis_key(key))
            .await
            .map_err(|e| LockError::Backend(format!("Failed to read '{}': {}", key, e)))?;

        Ok(current.as_deref() == Some(token))
    }
}
