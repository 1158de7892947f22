//! Lock provider contract

use std::time::Duration;

use async_trait::async_trait;

use crate::{LockError, LockKey};

/// Backend issuing named exclusive locks.
///
/// Every holder identifies itself with an opaque token; only the matching
/// token may release or renew. All calls are non-blocking: a held key makes
/// `try_acquire` return `Ok(false)` immediately.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Take the key for `lease` if it is free or its previous lease expired
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        lease: Duration,
    ) -> Result<bool, LockError>;

    /// Release the key if `token` still holds it
    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError>;

    /// Extend the lease if `token` still holds the key
    async fn renew(&self, key: &LockKey, token: &str, lease: Duration)
        -> Result<bool, LockError>;

    /// Whether `token` currently holds the key
    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError>;
}
