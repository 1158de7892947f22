//! Team API handlers
//!
//! Thin wrappers over [`crate::TeamService`]: the caller's identity comes
//! from the bearer token and is passed explicitly into every operation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use user_center_common::{Page, PageQuery, Result, ValidatedJson};
use validator::Validate;

use crate::api::middleware::{AuthUser, TeamsState};
use crate::domain::entities::{CreateTeam, TeamView, UpdateTeam, MAX_TEAM_PASSWORD_CHARS};

/// Request body for joining a team
#[derive(Debug, Default, Deserialize, Validate)]
pub struct JoinTeamRequest {
    /// Required for secret teams, ignored otherwise
    #[validate(length(max = MAX_TEAM_PASSWORD_CHARS))]
    pub password: Option<String>,
}

/// Request body for handing captaincy to another member
#[derive(Debug, Deserialize, Validate)]
pub struct TransferTeamRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

/// Query parameters for team search
#[derive(Debug, Default, Deserialize)]
pub struct SearchTeamsQuery {
    pub keyword: Option<String>,
    pub current: Option<i64>,
    pub page_size: Option<i64>,
}

impl SearchTeamsQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            current: self.current,
            page_size: self.page_size,
        }
    }
}

/// Create a team
///
/// **POST /v1/teams**
///
/// The caller becomes captain and first member.
pub async fn create_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    ValidatedJson(request): ValidatedJson<CreateTeam>,
) -> Result<(StatusCode, Json<TeamView>)> {
    let team = state.service.create(auth.user_id(), request).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Search joinable teams
///
/// **GET /v1/teams/search?keyword=&current=&page_size=**
///
/// Public, unexpired teams whose name, description, or tags contain the
/// keyword (case-insensitive).
pub async fn search_teams(
    _auth: AuthUser,
    State(state): State<TeamsState>,
    Query(query): Query<SearchTeamsQuery>,
) -> Result<Json<Page<TeamView>>> {
    let page = state
        .service
        .search(query.keyword.as_deref(), &query.page())
        .await?;
    Ok(Json(page))
}

/// Teams captained by the caller
///
/// **GET /v1/teams/managed**
pub async fn list_managed_teams(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
) -> Result<Json<Vec<TeamView>>> {
    Ok(Json(state.service.list_managed(auth.user_id()).await?))
}

/// Teams the caller has joined but does not captain
///
/// **GET /v1/teams/joined**
pub async fn list_joined_teams(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
) -> Result<Json<Vec<TeamView>>> {
    Ok(Json(state.service.list_joined(auth.user_id()).await?))
}

/// Get one team with its members
///
/// **GET /v1/teams/{id}**
pub async fn get_team(
    _auth: AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
) -> Result<Json<TeamView>> {
    Ok(Json(state.service.get(team_id).await?))
}

/// Update team details
///
/// **PATCH /v1/teams/{id}**
///
/// Captain only. Capacity may not drop below the live member count.
pub async fn update_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
    ValidatedJson(changes): ValidatedJson<UpdateTeam>,
) -> Result<Json<TeamView>> {
    let team = state
        .service
        .update(auth.user_id(), team_id, changes)
        .await?;
    Ok(Json(team))
}

/// Dismiss a team
///
/// **DELETE /v1/teams/{id}**
///
/// Captain only. Removes the team and every membership.
pub async fn dismiss_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
) -> Result<StatusCode> {
    state.service.dismiss(auth.user_id(), team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a team
///
/// **POST /v1/teams/{id}/join**
pub async fn join_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<JoinTeamRequest>,
) -> Result<Json<TeamView>> {
    let team = state
        .service
        .join(auth.user_id(), team_id, request.password.as_deref())
        .await?;
    Ok(Json(team))
}

/// Leave a team
///
/// **POST /v1/teams/{id}/exit**
///
/// The captain has to transfer or dismiss instead.
pub async fn exit_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
) -> Result<StatusCode> {
    state.service.exit(auth.user_id(), team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand captaincy to another member
///
/// **POST /v1/teams/{id}/transfer**
pub async fn transfer_team(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Path(team_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<TransferTeamRequest>,
) -> Result<Json<TeamView>> {
    let team = state
        .service
        .transfer(auth.user_id(), team_id, request.user_id)
        .await?;
    Ok(Json(team))
}
