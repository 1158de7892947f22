//! Authenticated caller context

/// Identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub id: i64,
    pub account: Option<String>,
}

/// Represents an authenticated request context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
}

impl AuthContext {
    pub fn new(user: AuthIdentity) -> Self {
        Self { user }
    }

    /// Caller's user id, passed explicitly into every team operation
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}
