//! Store seams and implementations for the Teams domain
//!
//! The lifecycle manager talks to three traits. Postgres-backed repositories
//! serve production; [`memory::InMemoryStore`] implements all three behind a
//! single mutex for tests and local runs.

pub mod memberships;
pub mod memory;
pub mod teams;
pub mod transactions;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use user_center_common::{PageQuery, Result};

use crate::domain::entities::{NewTeam, Team, TeamUser, UpdateProfile, UserFilter, UserProfile};

pub use memberships::MembershipRepository;
pub use memory::InMemoryStore;
pub use teams::TeamRepository;
pub use transactions::{
    create_membership_tx, create_team_tx, delete_memberships_for_team_tx, delete_team_tx,
};
pub use users::UserRepository;

/// Team rows
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn get_by_id(&self, team_id: i64) -> Result<Option<Team>>;

    /// Insert the team and the captain's membership as one unit
    async fn create_with_captain(&self, team: &NewTeam) -> Result<Team>;

    /// Persist every mutable column of `team`
    async fn update(&self, team: &Team) -> Result<Team>;

    /// Point the team at a new captain; touches that team only
    async fn set_captain(&self, team_id: i64, user_id: i64) -> Result<Team>;

    /// Delete the team and all its memberships as one unit.
    /// Returns `false` when the team did not exist.
    async fn delete_cascade(&self, team_id: i64) -> Result<bool>;

    async fn list_by_captain(&self, user_id: i64) -> Result<Vec<Team>>;

    async fn list_by_ids(&self, team_ids: &[i64]) -> Result<Vec<Team>>;

    /// Public, unexpired teams matching `keyword`, newest first, with the
    /// total match count
    async fn search(
        &self,
        keyword: Option<&str>,
        now: DateTime<Utc>,
        page: &PageQuery,
    ) -> Result<(Vec<Team>, i64)>;
}

/// Membership rows
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// A duplicate `(team, user)` pair is rejected with `Validation`
    async fn insert(&self, team_id: i64, user_id: i64) -> Result<TeamUser>;

    /// Returns whether a row was removed
    async fn remove(&self, team_id: i64, user_id: i64) -> Result<bool>;

    async fn list_by_team(&self, team_id: i64) -> Result<Vec<TeamUser>>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<TeamUser>>;
}

/// User profiles
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Profiles for `user_ids`, in the order given; unknown ids are skipped
    async fn list_profiles(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>>;

    /// Users matching `filter`, ordered by id, with the total match count
    async fn search_users(
        &self,
        filter: &UserFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserProfile>, i64)>;

    /// Apply `changes` to one user. Returns `None` when the user is unknown.
    async fn update_profile(
        &self,
        user_id: i64,
        changes: &UpdateProfile,
    ) -> Result<Option<UserProfile>>;

    /// Users other than `user_id` carrying at least one of `tags`, ordered by id
    async fn list_sharing_tags(&self, user_id: i64, tags: &[String]) -> Result<Vec<UserProfile>>;
}

/// Combined store access for the Teams domain
#[derive(Clone)]
pub struct TeamsRepositories {
    pub teams: Arc<dyn TeamStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl TeamsRepositories {
    /// Postgres-backed stores sharing one pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            teams: Arc::new(TeamRepository::new(pool.clone())),
            memberships: Arc::new(MembershipRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }

    /// All three seams served by one in-process store
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            teams: store.clone(),
            memberships: store.clone(),
            users: store,
        }
    }
}

/// `%keyword%` pattern for ILIKE with `%`, `_` and `\` escaped
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Clamp a row offset or count into `usize` for in-memory paging
pub(crate) fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(if value < 0 { 0 } else { usize::MAX })
}

/// Trimmed, non-empty keyword
pub(crate) fn normalize_keyword(keyword: Option<&str>) -> Option<&str> {
    keyword.map(str::trim).filter(|k| !k.is_empty())
}
