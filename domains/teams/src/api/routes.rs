//! Route definitions for Teams domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{teams, users};
use super::middleware::TeamsState;

/// Create user profile routes
fn user_routes() -> Router<TeamsState> {
    Router::new()
        .route(
            "/v1/account",
            get(users::get_profile).patch(users::update_profile),
        )
        .route("/v1/users/search", get(users::search_users))
        .route("/v1/users/match", get(users::match_users))
        .route("/v1/users/{id}", get(users::get_user))
}

/// Create team lifecycle routes
fn team_routes() -> Router<TeamsState> {
    Router::new()
        .route("/v1/teams", post(teams::create_team))
        .route("/v1/teams/search", get(teams::search_teams))
        .route("/v1/teams/managed", get(teams::list_managed_teams))
        .route("/v1/teams/joined", get(teams::list_joined_teams))
        .route(
            "/v1/teams/{id}",
            get(teams::get_team)
                .patch(teams::update_team)
                .delete(teams::dismiss_team),
        )
}

/// Create team membership routes
fn membership_routes() -> Router<TeamsState> {
    Router::new()
        .route("/v1/teams/{id}/join", post(teams::join_team))
        .route("/v1/teams/{id}/exit", post(teams::exit_team))
        .route("/v1/teams/{id}/transfer", post(teams::transfer_team))
}

/// Create all Teams domain API routes
pub fn routes() -> Router<TeamsState> {
    Router::new()
        .merge(user_routes())
        .merge(team_routes())
        .merge(membership_routes())
}
