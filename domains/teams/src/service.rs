//! Team lifecycle manager
//!
//! Every mutation takes its locks first (team lock before the caller's user
//! lock), re-reads current state, checks the business rules, writes, builds
//! the returned view, and releases the locks on every exit path. Reads take
//! no locks.

use chrono::Utc;
use user_center_common::{hash_password, Error, Page, PageQuery, Result};
use user_center_lock::{LockKey, LockManager, LockSet};
use validator::Validate;

use crate::domain::entities::{CreateTeam, NewTeam, Team, TeamStatus, TeamView, UpdateTeam};
use crate::domain::validation::{
    ensure_capacity, ensure_captain, ensure_joinable, ensure_not_captain, require_secret_password,
};
use crate::repository::TeamsRepositories;

#[derive(Clone)]
pub struct TeamService {
    repos: TeamsRepositories,
    locks: LockManager,
}

impl TeamService {
    pub fn new(repos: TeamsRepositories, locks: LockManager) -> Self {
        Self { repos, locks }
    }

    pub fn repos(&self) -> &TeamsRepositories {
        &self.repos
    }

    /// Create a team captained by `caller`, who becomes its first member
    pub async fn create(&self, caller: i64, request: CreateTeam) -> Result<TeamView> {
        request
            .validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;

        let password = match request.status {
            TeamStatus::Secret => Some(hash_password(require_secret_password(
                request.password.as_deref(),
            )?)?),
            TeamStatus::Public | TeamStatus::Private => None,
        };

        let new_team = NewTeam {
            name: request.name,
            description: request.description,
            max_number: request.max_number,
            status: request.status,
            password,
            expire_time: request.expire_time,
            user_id: caller,
            tags: request.tags,
        };

        let locks = self.lock(vec![LockKey::user(caller)]).await?;
        let outcome = self.create_locked(&new_team).await;
        locks.release_all().await;

        let view = outcome?;
        tracing::info!(team_id = view.id, user_id = caller, status = %view.status, "Team created");
        Ok(view)
    }

    async fn create_locked(&self, new_team: &NewTeam) -> Result<TeamView> {
        let team = self.repos.teams.create_with_captain(new_team).await?;
        // The captain is the only member of a fresh team
        let captain = self.repos.users.list_profiles(&[team.user_id]).await?;
        Ok(TeamView::assemble(team, 1, captain))
    }

    /// Add `caller` to the team
    pub async fn join(
        &self,
        caller: i64,
        team_id: i64,
        password: Option<&str>,
    ) -> Result<TeamView> {
        ensure_team_id(team_id)?;

        let locks = self
            .lock(vec![LockKey::team(team_id), LockKey::user(caller)])
            .await?;
        let outcome = self.join_locked(caller, team_id, password).await;
        locks.release_all().await;

        let view = outcome?;
        tracing::info!(team_id, user_id = caller, "Joined team");
        Ok(view)
    }

    async fn join_locked(
        &self,
        caller: i64,
        team_id: i64,
        password: Option<&str>,
    ) -> Result<TeamView> {
        let team = self.load_team(team_id).await?;
        let members = self.repos.memberships.list_by_team(team_id).await?;

        ensure_joinable(&team, &members, caller, password, Utc::now())?;

        self.repos.memberships.insert(team_id, caller).await?;
        self.assemble(team).await
    }

    /// Remove `caller` from the team; the captain has to transfer or dismiss
    pub async fn exit(&self, caller: i64, team_id: i64) -> Result<()> {
        ensure_team_id(team_id)?;

        let locks = self
            .lock(vec![LockKey::team(team_id), LockKey::user(caller)])
            .await?;
        let outcome = self.exit_locked(caller, team_id).await;
        locks.release_all().await;

        outcome?;
        tracing::info!(team_id, user_id = caller, "Exited team");
        Ok(())
    }

    async fn exit_locked(&self, caller: i64, team_id: i64) -> Result<()> {
        let team = self.load_team(team_id).await?;
        ensure_not_captain(&team, caller)?;

        if !self.repos.memberships.remove(team_id, caller).await? {
            return Err(Error::Validation("Not a member of this team".to_string()));
        }
        Ok(())
    }

    /// Delete the team and every membership row; captain only
    pub async fn dismiss(&self, caller: i64, team_id: i64) -> Result<()> {
        ensure_team_id(team_id)?;

        let locks = self.lock(vec![LockKey::team(team_id)]).await?;
        let outcome = self.dismiss_locked(caller, team_id).await;
        locks.release_all().await;

        outcome?;
        tracing::info!(team_id, user_id = caller, "Team dismissed");
        Ok(())
    }

    async fn dismiss_locked(&self, caller: i64, team_id: i64) -> Result<()> {
        let team = self.load_team(team_id).await?;
        ensure_captain(&team, caller, "dismiss")?;

        if !self.repos.teams.delete_cascade(team_id).await? {
            return Err(Error::NotFound("Team not found".to_string()));
        }
        Ok(())
    }

    /// Apply the supplied fields; captain only
    pub async fn update(&self, caller: i64, team_id: i64, changes: UpdateTeam) -> Result<TeamView> {
        ensure_team_id(team_id)?;
        changes
            .validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;

        let locks = self
            .lock(vec![LockKey::team(team_id), LockKey::user(caller)])
            .await?;
        let outcome = self.update_locked(caller, team_id, changes).await;
        locks.release_all().await;

        let view = outcome?;
        tracing::info!(team_id, user_id = caller, status = %view.status, "Team updated");
        Ok(view)
    }

    async fn update_locked(
        &self,
        caller: i64,
        team_id: i64,
        changes: UpdateTeam,
    ) -> Result<TeamView> {
        let mut team = self.load_team(team_id).await?;
        ensure_captain(&team, caller, "update")?;

        if let Some(max_number) = changes.max_number {
            let members = self.repos.memberships.list_by_team(team_id).await?;
            ensure_capacity(max_number, members.len())?;
            team.max_number = max_number;
        }

        let status = changes.status.unwrap_or(team.status);
        team.password = match status {
            TeamStatus::Secret => {
                let supplied = changes.password.as_deref().filter(|p| !p.trim().is_empty());
                match (supplied, team.password.take()) {
                    (Some(plain), _) => Some(hash_password(plain)?),
                    (None, Some(existing)) if team.status == TeamStatus::Secret => Some(existing),
                    _ => {
                        return Err(Error::Validation(
                            "Secret teams require a password".to_string(),
                        ))
                    }
                }
            }
            TeamStatus::Public | TeamStatus::Private => None,
        };
        team.status = status;

        if let Some(name) = changes.name {
            team.name = name;
        }
        if let Some(description) = changes.description {
            team.description = Some(description);
        }
        if let Some(expire_time) = changes.expire_time {
            team.expire_time = expire_time;
        }
        if let Some(tags) = changes.tags {
            team.tags = tags;
        }

        let team = self.repos.teams.update(&team).await?;
        self.assemble(team).await
    }

    /// Hand captaincy to another current member; captain only.
    /// Membership rows are left as they are.
    pub async fn transfer(&self, caller: i64, team_id: i64, target: i64) -> Result<TeamView> {
        ensure_team_id(team_id)?;

        let locks = self
            .lock(vec![LockKey::team(team_id), LockKey::user(caller)])
            .await?;
        let outcome = self.transfer_locked(caller, team_id, target).await;
        locks.release_all().await;

        let view = outcome?;
        tracing::info!(team_id, from_user_id = caller, to_user_id = target, "Captaincy transferred");
        Ok(view)
    }

    async fn transfer_locked(&self, caller: i64, team_id: i64, target: i64) -> Result<TeamView> {
        let team = self.load_team(team_id).await?;
        ensure_captain(&team, caller, "transfer")?;

        if target == caller {
            return Err(Error::Validation(
                "Cannot transfer the team to yourself".to_string(),
            ));
        }

        if self.repos.users.get_by_id(target).await?.is_none() {
            return Err(Error::NotFound("User not found".to_string()));
        }

        let members = self.repos.memberships.list_by_team(team_id).await?;
        if !members.iter().any(|m| m.user_id == target) {
            return Err(Error::Validation(
                "The new captain must be a member of the team".to_string(),
            ));
        }

        let team = self.repos.teams.set_captain(team_id, target).await?;
        self.assemble(team).await
    }

    pub async fn get(&self, team_id: i64) -> Result<TeamView> {
        ensure_team_id(team_id)?;
        let team = self.load_team(team_id).await?;
        self.assemble(team).await
    }

    /// Public, unexpired teams, optionally filtered by keyword
    pub async fn search(&self, keyword: Option<&str>, page: &PageQuery) -> Result<Page<TeamView>> {
        let (teams, total) = self.repos.teams.search(keyword, Utc::now(), page).await?;

        let mut views = Vec::with_capacity(teams.len());
        for team in teams {
            views.push(self.assemble(team).await?);
        }
        Ok(Page::new(views, total, page))
    }

    /// Teams captained by `caller`
    pub async fn list_managed(&self, caller: i64) -> Result<Vec<TeamView>> {
        let teams = self.repos.teams.list_by_captain(caller).await?;
        self.assemble_all(teams).await
    }

    /// Teams `caller` belongs to without captaining
    pub async fn list_joined(&self, caller: i64) -> Result<Vec<TeamView>> {
        let team_ids: Vec<i64> = self
            .repos
            .memberships
            .list_by_user(caller)
            .await?
            .into_iter()
            .map(|m| m.team_id)
            .collect();

        let teams = self
            .repos
            .teams
            .list_by_ids(&team_ids)
            .await?
            .into_iter()
            .filter(|t| !t.is_captain(caller))
            .collect();
        self.assemble_all(teams).await
    }

    async fn lock(&self, keys: Vec<LockKey>) -> Result<LockSet> {
        Ok(self.locks.acquire_all(keys).await?)
    }

    async fn load_team(&self, team_id: i64) -> Result<Team> {
        self.repos
            .teams
            .get_by_id(team_id)
            .await?
            .ok_or_else(|| Error::NotFound("Team not found".to_string()))
    }

    async fn assemble(&self, team: Team) -> Result<TeamView> {
        let member_ids: Vec<i64> = self
            .repos
            .memberships
            .list_by_team(team.id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        let profiles = self.repos.users.list_profiles(&member_ids).await?;
        Ok(TeamView::assemble(team, member_ids.len(), profiles))
    }

    async fn assemble_all(&self, teams: Vec<Team>) -> Result<Vec<TeamView>> {
        let mut views = Vec::with_capacity(teams.len());
        for team in teams {
            views.push(self.assemble(team).await?);
        }
        Ok(views)
    }
}

fn ensure_team_id(team_id: i64) -> Result<()> {
    if team_id <= 0 {
        return Err(Error::Validation("Invalid team id".to_string()));
    }
    Ok(())
}
