//! Authentication middleware for the user center API
//!
//! Resolves the caller of every request from a bearer JWT and hands the
//! identity to handlers explicitly. Works with any domain state implementing
//! `FromRef<S>` for `AuthBackend`.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;

pub use backend::AuthBackend;
pub use claims::UserClaims;
pub use config::AuthConfig;
pub use context::{AuthContext, AuthIdentity};
pub use error::AuthError;
pub use extractors::AuthUser;
pub use jwt::issue_token;
