//! JWT claims types

use serde::{Deserialize, Serialize};

/// JWT claims issued for a logged-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (numeric user ID)
    pub sub: String,
    /// Login account name
    #[serde(default)]
    pub account: Option<String>,
    /// Issued at
    pub iat: u64,
    /// Expires at
    pub exp: u64,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}
