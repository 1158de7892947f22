//! Lock errors

use thiserror::Error;
use user_center_common::Error;

#[derive(Debug, Error)]
pub enum LockError {
    /// Every attempt within the retry budget found the key held
    #[error("Operation too frequent: lock {key} still held after {attempts} attempts")]
    Contended { key: String, attempts: u32 },

    /// The lock backend itself failed
    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl From<LockError> for Error {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Contended { .. } => Error::Conflict(err.to_string()),
            LockError::Backend(msg) => Error::Internal(format!("Lock backend failed: {}", msg)),
        }
    }
}
