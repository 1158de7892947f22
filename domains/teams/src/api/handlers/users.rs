//! User profile API handlers
//!
//! - GET /v1/account - Current user profile
//! - PATCH /v1/account - Edit current user profile
//! - GET /v1/users/search - Search users by nickname or tags
//! - GET /v1/users/match - Users sharing the caller's tags
//! - GET /v1/users/{id} - Another user's public profile

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use user_center_common::{Page, PageQuery, Result, ValidatedJson};

use crate::api::middleware::{AuthUser, TeamsState};
use crate::domain::entities::{UpdateProfile, UserFilter, UserProfile};

const DEFAULT_MATCH_COUNT: usize = 10;

/// Query parameters for user search
///
/// `tags` is comma-separated; a nickname takes precedence over tags.
#[derive(Debug, Default, Deserialize)]
pub struct SearchUsersQuery {
    pub nickname: Option<String>,
    pub tags: Option<String>,
    pub current: Option<i64>,
    pub page_size: Option<i64>,
}

impl SearchUsersQuery {
    fn filter(&self) -> UserFilter {
        let tags: Vec<String> = self
            .tags
            .as_deref()
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        UserFilter::new(self.nickname.as_deref(), &tags)
    }

    fn page(&self) -> PageQuery {
        PageQuery {
            current: self.current,
            page_size: self.page_size,
        }
    }
}

/// Query parameters for tag matching
#[derive(Debug, Default, Deserialize)]
pub struct MatchUsersQuery {
    pub num: Option<usize>,
}

/// Get current user profile
///
/// **GET /v1/account**
pub async fn get_profile(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.get(auth.user_id()).await?))
}

/// Edit current user profile
///
/// **PATCH /v1/account**
///
/// Unknown fields such as `account` are ignored.
pub async fn update_profile(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    ValidatedJson(request): ValidatedJson<UpdateProfile>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.update(auth.user_id(), request).await?))
}

/// Search users
///
/// **GET /v1/users/search?nickname=&tags=a,b&current=&page_size=**
pub async fn search_users(
    _auth: AuthUser,
    State(state): State<TeamsState>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<Page<UserProfile>>> {
    let page = state
        .profiles
        .search(&query.filter(), &query.page())
        .await?;
    Ok(Json(page))
}

/// Users ranked by tags shared with the caller
///
/// **GET /v1/users/match?num=**
pub async fn match_users(
    AuthUser(auth): AuthUser,
    State(state): State<TeamsState>,
    Query(query): Query<MatchUsersQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let num = query.num.unwrap_or(DEFAULT_MATCH_COUNT);
    Ok(Json(state.profiles.match_users(auth.user_id(), num).await?))
}

/// Get a user's profile by id
///
/// **GET /v1/users/{id}**
pub async fn get_user(
    _auth: AuthUser,
    State(state): State<TeamsState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.get(user_id).await?))
}
