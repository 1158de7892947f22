//! Lock acquisition policy and held-lock guards

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{LockError, LockKey, LockProvider};

/// Retry and lease policy applied to every lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Total try-acquire attempts before giving up with `Contended`
    pub max_attempts: u32,
    /// Lease after which a held lock expires on its own. Callers must finish
    /// their critical section well inside it or renew before it lapses.
    pub lease: Duration,
    /// Pause between attempts; zero means retry immediately
    pub retry_delay: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            lease: Duration::from_secs(30),
            retry_delay: Duration::ZERO,
        }
    }
}

impl LockPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Acquires locks from a provider under a single [`LockPolicy`].
#[derive(Clone)]
pub struct LockManager {
    provider: Arc<dyn LockProvider>,
    policy: LockPolicy,
}

impl LockManager {
    pub fn new(provider: Arc<dyn LockProvider>, policy: LockPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    /// Acquire one key, retrying up to `max_attempts` times.
    pub async fn acquire(&self, key: LockKey) -> Result<LockGuard, LockError> {
        let token = Uuid::new_v4().to_string();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self
                .provider
                .try_acquire(&key, &token, self.policy.lease)
                .await?
            {
                tracing::debug!(lock_key = %key, attempt, "Lock acquired");
                return Ok(LockGuard {
                    key,
                    token,
                    provider: Arc::clone(&self.provider),
                    lease: self.policy.lease,
                    released: false,
                });
            }

            if attempt < max_attempts {
                if self.policy.retry_delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
            }
        }

        tracing::warn!(lock_key = %key, attempts = max_attempts, "Lock contended");
        Err(LockError::Contended {
            key: key.to_string(),
            attempts: max_attempts,
        })
    }

    /// Acquire keys in the given order. On failure every key already taken
    /// is released before the error is returned.
    pub async fn acquire_all(&self, keys: Vec<LockKey>) -> Result<LockSet, LockError> {
        let mut held = LockSet::default();
        for key in keys {
            match self.acquire(key).await {
                Ok(guard) => held.push(guard),
                Err(e) => {
                    held.release_all().await;
                    return Err(e);
                }
            }
        }
        Ok(held)
    }
}

/// A held lock.
///
/// Call [`LockGuard::release`] on every exit path. A guard dropped without
/// releasing (panic, cancelled future) schedules a best-effort release on
/// the current runtime; the lease bounds anything that still slips through.
pub struct LockGuard {
    key: LockKey,
    token: String,
    provider: Arc<dyn LockProvider>,
    lease: Duration,
    released: bool,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("lease", &self.lease)
            .field("released", &self.released)
            .finish()
    }
}

impl LockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Extend the lease for critical sections that may outlive it.
    /// Team operations never need this: each locked body is a few store
    /// round trips against a lease of at least one second.
    /// Returns `false` when the lease had already lapsed.
    pub async fn renew(&self) -> Result<bool, LockError> {
        self.provider.renew(&self.key, &self.token, self.lease).await
    }

    /// Whether this guard still holds its key
    pub async fn is_held(&self) -> Result<bool, LockError> {
        self.provider.is_held(&self.key, &self.token).await
    }

    /// Release the key if this guard still holds it.
    pub async fn release(mut self) {
        self.released = true;
        match self.provider.release(&self.key, &self.token).await {
            Ok(true) => tracing::debug!(lock_key = %self.key, "Lock released"),
            Ok(false) => {
                tracing::warn!(lock_key = %self.key, "Lock lease expired before release")
            }
            Err(e) => tracing::warn!(lock_key = %self.key, error = %e, "Failed to release lock"),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let key = self.key.clone();
        let token = std::mem::take(&mut self.token);
        let provider = Arc::clone(&self.provider);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(lock_key = %key, "Lock guard dropped while held; releasing in background");
                handle.spawn(async move {
                    if let Err(e) = provider.release(&key, &token).await {
                        tracing::warn!(lock_key = %key, error = %e, "Background lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock_key = %key, "Lock guard dropped outside a runtime; lease will expire");
            }
        }
    }
}

/// Locks held together, released in reverse acquisition order.
#[derive(Debug, Default)]
pub struct LockSet {
    guards: Vec<LockGuard>,
}

impl LockSet {
    pub fn push(&mut self, guard: LockGuard) {
        self.guards.push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Renew every held lease; `false` if any had lapsed
    pub async fn renew_all(&self) -> Result<bool, LockError> {
        let mut all_held = true;
        for guard in &self.guards {
            all_held &= guard.renew().await?;
        }
        Ok(all_held)
    }

    pub async fn release_all(mut self) {
        while let Some(guard) = self.guards.pop() {
            guard.release().await;
        }
    }
}
