//! Teams domain: team lifecycle, memberships, search, and user profiles

pub mod api;
pub mod domain;
pub mod profiles;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
// Re-export repository types
pub use repository::{
    InMemoryStore, MembershipRepository, MembershipStore, TeamRepository, TeamStore,
    TeamsRepositories, UserDirectory, UserRepository,
};
pub use profiles::ProfileService;
pub use service::TeamService;

// Re-export API types
pub use api::routes;
pub use api::TeamsState;
