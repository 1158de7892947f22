//! Authentication backend
//!
//! Turns a bearer token into the caller's identity. The identity travels
//! with the request as an explicit value; nothing is kept in session state.

use crate::claims::UserClaims;
use crate::config::AuthConfig;
use crate::context::{AuthContext, AuthIdentity};
use crate::error::AuthError;

/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthBackend {
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn authenticate_jwt(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = crate::jwt::validate_jwt_token(token, &self.config)?;
        identity_from_claims(claims).map(AuthContext::new)
    }
}

fn identity_from_claims(claims: UserClaims) -> Result<AuthIdentity, AuthError> {
    let id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidUserId)?;
    if id <= 0 {
        return Err(AuthError::InvalidUserId);
    }
    Ok(AuthIdentity {
        id,
        account: claims.account,
    })
}
