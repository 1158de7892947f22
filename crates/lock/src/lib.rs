//! Distributed mutual exclusion for team operations
//!
//! Locks are named by [`LockKey`], held for a bounded lease, and acquired
//! through a [`LockManager`] that applies one retry policy to every key.
//! Backends implement [`LockProvider`]:
//! - [`RedisLockProvider`] for multi-process deployments
//! - [`InMemoryLockProvider`] for tests and single-process runs

mod error;
mod key;
mod manager;
mod memory;
mod provider;
mod redis_provider;

pub use error::LockError;
pub use key::{LockKey, TEAM_LOCK_NAMESPACE};
pub use manager::{LockGuard, LockManager, LockPolicy, LockSet};
pub use memory::InMemoryLockProvider;
pub use provider::LockProvider;
pub use redis_provider::{RedisLockConfig, RedisLockProvider};
