//! Teams domain state and auth backend integration

use axum::extract::FromRef;
use user_center_auth::AuthBackend;

pub use user_center_auth::AuthUser;

use crate::profiles::ProfileService;
use crate::service::TeamService;

/// Application state for the Teams domain
#[derive(Clone)]
pub struct TeamsState {
    pub service: TeamService,
    pub profiles: ProfileService,
    pub auth: AuthBackend,
}

impl TeamsState {
    /// Profiles read and write through the same user directory as teams
    pub fn new(service: TeamService, auth: AuthBackend) -> Self {
        let profiles = ProfileService::new(service.repos().users.clone());
        Self {
            service,
            profiles,
            auth,
        }
    }
}

impl FromRef<TeamsState> for AuthBackend {
    fn from_ref(state: &TeamsState) -> Self {
        state.auth.clone()
    }
}
