//! In-process store for tests and single-node runs
//!
//! One mutex guards teams, memberships, and users together, so the
//! multi-row operations (`create_with_captain`, `delete_cascade`) are atomic
//! to every other caller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use user_center_common::{Error, PageQuery, Result};

use super::{normalize_keyword, to_usize, MembershipStore, TeamStore, UserDirectory};
use crate::domain::entities::{
    NewTeam, Team, TeamStatus, TeamUser, UpdateProfile, UserFilter, UserProfile,
};

#[derive(Default)]
struct MemoryState {
    teams: BTreeMap<i64, Team>,
    memberships: Vec<TeamUser>,
    users: BTreeMap<i64, UserProfile>,
    next_team_id: i64,
    next_membership_id: i64,
}

impl MemoryState {
    fn insert_membership(&mut self, team_id: i64, user_id: i64) -> Result<TeamUser> {
        if self
            .memberships
            .iter()
            .any(|m| m.team_id == team_id && m.user_id == user_id)
        {
            return Err(Error::Validation("Already in team".to_string()));
        }

        self.next_membership_id += 1;
        let row = TeamUser {
            id: self.next_membership_id,
            team_id,
            user_id,
            join_time: Utc::now(),
        };
        self.memberships.push(row.clone());
        Ok(row)
    }

    fn team_mut(&mut self, team_id: i64) -> Result<&mut Team> {
        self.teams
            .get_mut(&team_id)
            .ok_or_else(|| Error::NotFound("Record not found".to_string()))
    }
}

/// Mutex-guarded map store implementing every Teams store trait
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user profile, replacing any existing one with the same id
    pub async fn insert_user(&self, profile: UserProfile) {
        self.state.lock().await.users.insert(profile.id, profile);
    }

    /// Total membership rows across all teams
    pub async fn membership_count(&self) -> usize {
        self.state.lock().await.memberships.len()
    }
}

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn get_by_id(&self, team_id: i64) -> Result<Option<Team>> {
        Ok(self.state.lock().await.teams.get(&team_id).cloned())
    }

    async fn create_with_captain(&self, team: &NewTeam) -> Result<Team> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        state.next_team_id += 1;
        let created = Team {
            id: state.next_team_id,
            name: team.name.clone(),
            description: team.description.clone(),
            max_number: team.max_number,
            status: team.status,
            password: team.password.clone(),
            expire_time: team.expire_time,
            user_id: team.user_id,
            tags: team.tags.clone(),
            create_time: now,
            update_time: now,
        };

        state.insert_membership(created.id, created.user_id)?;
        state.teams.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, team: &Team) -> Result<Team> {
        let mut state = self.state.lock().await;
        let stored = state.team_mut(team.id)?;

        stored.name = team.name.clone();
        stored.description = team.description.clone();
        stored.max_number = team.max_number;
        stored.status = team.status;
        stored.password = team.password.clone();
        stored.expire_time = team.expire_time;
        stored.tags = team.tags.clone();
        stored.update_time = Utc::now();
        Ok(stored.clone())
    }

    async fn set_captain(&self, team_id: i64, user_id: i64) -> Result<Team> {
        let mut state = self.state.lock().await;
        let stored = state.team_mut(team_id)?;

        stored.user_id = user_id;
        stored.update_time = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_cascade(&self, team_id: i64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let existed = state.teams.remove(&team_id).is_some();
        state.memberships.retain(|m| m.team_id != team_id);
        Ok(existed)
    }

    async fn list_by_captain(&self, user_id: i64) -> Result<Vec<Team>> {
        let state = self.state.lock().await;
        Ok(state
            .teams
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_ids(&self, team_ids: &[i64]) -> Result<Vec<Team>> {
        let state = self.state.lock().await;
        Ok(state
            .teams
            .values()
            .filter(|t| team_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        keyword: Option<&str>,
        now: DateTime<Utc>,
        page: &PageQuery,
    ) -> Result<(Vec<Team>, i64)> {
        let needle = normalize_keyword(keyword).map(str::to_lowercase);
        let state = self.state.lock().await;

        let matches: Vec<&Team> = state
            .teams
            .values()
            .rev()
            .filter(|t| t.status == TeamStatus::Public && t.expire_time > now)
            .filter(|t| needle.as_deref().map_or(true, |n| t.matches_keyword(n)))
            .collect();

        Ok(paginate(matches, page))
    }
}

fn paginate<T: Clone>(matches: Vec<&T>, page: &PageQuery) -> (Vec<T>, i64) {
    let total = matches.len() as i64;
    let records = matches
        .into_iter()
        .skip(to_usize(page.offset()))
        .take(to_usize(page.page_size()))
        .cloned()
        .collect();
    (records, total)
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn insert(&self, team_id: i64, user_id: i64) -> Result<TeamUser> {
        self.state.lock().await.insert_membership(team_id, user_id)
    }

    async fn remove(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        Ok(state.memberships.len() < before)
    }

    async fn list_by_team(&self, team_id: i64) -> Result<Vec<TeamUser>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<TeamUser>> {
        let state = self.state.lock().await;
        let mut rows: Vec<TeamUser> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.team_id);
        Ok(rows)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_by_id(&self, user_id: i64) -> Result<Option<UserProfile>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn list_profiles(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn search_users(
        &self,
        filter: &UserFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserProfile>, i64)> {
        let state = self.state.lock().await;
        let matches: Vec<&UserProfile> = state
            .users
            .values()
            .filter(|u| filter.matches(u))
            .collect();
        Ok(paginate(matches, page))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        changes: &UpdateProfile,
    ) -> Result<Option<UserProfile>> {
        let mut state = self.state.lock().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }

    async fn list_sharing_tags(&self, user_id: i64, tags: &[String]) -> Result<Vec<UserProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.id != user_id && u.shared_tag_count(tags) > 0)
            .cloned()
            .collect())
    }
}
