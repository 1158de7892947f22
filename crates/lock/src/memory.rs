//! In-process lock provider
//!
//! Provides lease-bounded locks without external dependencies, for tests and
//! single-process deployments. Mutual exclusion only holds within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{LockError, LockKey, LockProvider};

#[derive(Debug, Clone)]
struct Holder {
    token: String,
    expires_at: Instant,
}

impl Holder {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLockProvider {
    holders: Arc<Mutex<HashMap<String, Holder>>>,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held by a live lease
    pub fn held_count(&self) -> usize {
        let now = Instant::now();
        self.holders
            .lock()
            .map(|holders| holders.values().filter(|h| h.is_live(now)).count())
            .unwrap_or(0)
    }

    fn holders(&self) -> Result<MutexGuard<'_, HashMap<String, Holder>>, LockError> {
        self.holders
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".to_string()))
    }
}

#[async_trait]
impl LockProvider for InMemoryLockProvider {
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut holders = self.holders()?;

        if let Some(holder) = holders.get(key.as_str()) {
            if holder.is_live(now) {
                return Ok(false);
            }
        }

        holders.insert(
            key.as_str().to_string(),
            Holder {
                token: token.to_string(),
                expires_at: now + lease,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let mut holders = self.holders()?;
        match holders.get(key.as_str()) {
            Some(holder) if holder.token == token => {
                holders.remove(key.as_str());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn renew(
        &self,
        key: &LockKey,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut holders = self.holders()?;
        match holders.get_mut(key.as_str()) {
            Some(holder) if holder.token == token && holder.is_live(now) => {
                holder.expires_at = now + lease;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let now = Instant::now();
        let holders = self.holders()?;
        Ok(holders
            .get(key.as_str())
            .is_some_and(|holder| holder.token == token && holder.is_live(now)))
    }
}
