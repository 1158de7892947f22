//! Lock key naming

use std::fmt;

/// Namespace shared by every team-operation lock
pub const TEAM_LOCK_NAMESPACE: &str = "user-center:team";

/// Name of an exclusive lock.
///
/// The rendered form is stable: existing deployments key their locks as
/// `user-center:team:teamId-{id}` and `user-center:team:userId-{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Lock serialising membership mutations of one team
    pub fn team(team_id: i64) -> Self {
        Self(format!("{}:teamId-{}", TEAM_LOCK_NAMESPACE, team_id))
    }

    /// Lock serialising ownership changes of one user
    pub fn user(user_id: i64) -> Self {
        Self(format!("{}:userId-{}", TEAM_LOCK_NAMESPACE, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
