//! Domain entities for the user center teams domain
//!
//! Teams, membership rows, and the password-stripped user profile. Request
//! payloads for the mutating operations live here too so that the HTTP layer
//! and direct callers of [`crate::TeamService`] and [`crate::ProfileService`]
//! share one validated shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Longest allowed team name, in characters
pub const MAX_TEAM_NAME_CHARS: u64 = 20;

/// Longest allowed team description, in characters
pub const MAX_TEAM_DESCRIPTION_CHARS: u64 = 512;

/// Upper bound for a team's member capacity
pub const MAX_TEAM_CAPACITY: i32 = 20;

/// Longest allowed join password for secret teams
pub const MAX_TEAM_PASSWORD_CHARS: u64 = 32;

pub const MAX_NICKNAME_CHARS: u64 = 256;
pub const MAX_AVATAR_URL_CHARS: u64 = 1024;
pub const MAX_PROFILE_CHARS: u64 = 512;

/// Tags per team or user
pub const MAX_TAGS: u64 = 10;

/// Most users a single match request may return
pub const MAX_MATCH_USERS: usize = 20;

/// Team visibility
///
/// Stored as an integer column (`0`, `1`, `2`) and serialized as a lowercase
/// name on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    /// Discoverable and freely joinable
    #[default]
    Public = 0,
    /// Never joinable by outsiders
    Private = 1,
    /// Joinable only with the correct password
    Secret = 2,
}

impl TeamStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TeamStatus::Public),
            1 => Some(TeamStatus::Private),
            2 => Some(TeamStatus::Secret),
            _ => None,
        }
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamStatus::Public => write!(f, "public"),
            TeamStatus::Private => write!(f, "private"),
            TeamStatus::Secret => write!(f, "secret"),
        }
    }
}

/// Team entity
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub max_number: i32,
    pub status: TeamStatus,
    /// Salted hash, present only while the team is secret
    pub password: Option<String>,
    pub expire_time: DateTime<Utc>,
    /// Captain
    pub user_id: i64,
    pub tags: Vec<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Team {
    pub fn is_captain(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time < now
    }

    /// Case-insensitive keyword match over name, description, and tags.
    /// `needle` must already be lowercase.
    pub fn matches_keyword(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Team row about to be inserted, captain included
#[derive(Debug, Clone, PartialEq)]
pub struct NewTeam {
    pub name: String,
    pub description: Option<String>,
    pub max_number: i32,
    pub status: TeamStatus,
    pub password: Option<String>,
    pub expire_time: DateTime<Utc>,
    pub user_id: i64,
    pub tags: Vec<String>,
}

/// Membership edge: `user_id` belongs to `team_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamUser {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    pub join_time: DateTime<Utc>,
}

/// User profile without credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub account: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub gender: Option<i32>,
    pub tags: Vec<String>,
    pub profile: Option<String>,
    pub create_time: DateTime<Utc>,
}

impl UserProfile {
    /// Bare profile for a newly known account
    pub fn new(id: i64, account: impl Into<String>) -> Self {
        Self {
            id,
            account: account.into(),
            nickname: None,
            avatar_url: None,
            gender: None,
            tags: Vec::new(),
            profile: None,
            create_time: Utc::now(),
        }
    }

    /// Whether the user carries every one of `tags` (exact match)
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|wanted| self.tags.contains(wanted))
    }

    /// Number of `tags` this user shares
    pub fn shared_tag_count(&self, tags: &[String]) -> usize {
        self.tags.iter().filter(|tag| tags.contains(tag)).count()
    }
}

/// User search criteria. A nickname takes precedence over tags; with
/// neither, every user matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    /// Case-insensitive substring of the nickname
    Nickname(String),
    /// User must carry all of these tags
    Tags(Vec<String>),
}

impl UserFilter {
    pub fn new(nickname: Option<&str>, tags: &[String]) -> Self {
        if let Some(nickname) = nickname.map(str::trim).filter(|n| !n.is_empty()) {
            return UserFilter::Nickname(nickname.to_string());
        }

        let mut tags: Vec<String> = tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        tags.sort();
        tags.dedup();

        if tags.is_empty() {
            UserFilter::All
        } else {
            UserFilter::Tags(tags)
        }
    }

    pub fn matches(&self, user: &UserProfile) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Nickname(needle) => user
                .nickname
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle.to_lowercase())),
            UserFilter::Tags(tags) => user.has_all_tags(tags),
        }
    }
}

/// Team assembled with its members, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub max_number: i32,
    pub status: TeamStatus,
    pub has_password: bool,
    pub expire_time: DateTime<Utc>,
    pub user_id: i64,
    pub tags: Vec<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub member_count: usize,
    pub members: Vec<UserProfile>,
}

impl TeamView {
    /// `member_count` counts membership rows; `members` holds the profiles
    /// the directory could resolve
    pub fn assemble(team: Team, member_count: usize, members: Vec<UserProfile>) -> Self {
        Self {
            id: team.id,
            name: team.name,
            description: team.description,
            max_number: team.max_number,
            status: team.status,
            has_password: team.password.is_some(),
            expire_time: team.expire_time,
            user_id: team.user_id,
            tags: team.tags,
            create_time: team.create_time,
            update_time: team.update_time,
            member_count,
            members,
        }
    }
}

fn validate_future(expire_time: &DateTime<Utc>) -> std::result::Result<(), ValidationError> {
    if *expire_time <= Utc::now() {
        return Err(ValidationError::new("expire_time_in_past")
            .with_message("Expire time must be in the future".into()));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> std::result::Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(ValidationError::new("blank_tag").with_message("Tags must not be blank".into()));
    }
    Ok(())
}

/// Request for creating a team
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTeam {
    #[validate(length(min = 1, max = MAX_TEAM_NAME_CHARS))]
    pub name: String,

    #[validate(length(max = MAX_TEAM_DESCRIPTION_CHARS))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = MAX_TEAM_CAPACITY))]
    pub max_number: i32,

    #[serde(default)]
    pub status: TeamStatus,

    /// Plain-text password, required when `status` is secret
    #[validate(length(max = MAX_TEAM_PASSWORD_CHARS))]
    pub password: Option<String>,

    #[validate(custom(function = "validate_future"))]
    pub expire_time: DateTime<Utc>,

    #[serde(default)]
    #[validate(length(max = MAX_TAGS), custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

/// Edit of the caller's own profile; absent fields are left unchanged.
/// Account and creation time are never editable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = MAX_NICKNAME_CHARS))]
    pub nickname: Option<String>,

    #[validate(length(max = MAX_AVATAR_URL_CHARS))]
    pub avatar_url: Option<String>,

    /// 0 unknown, 1 male, 2 female
    #[validate(range(min = 0, max = 2))]
    pub gender: Option<i32>,

    #[validate(length(max = MAX_TAGS), custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,

    #[validate(length(max = MAX_PROFILE_CHARS))]
    pub profile: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.avatar_url.is_none()
            && self.gender.is_none()
            && self.tags.is_none()
            && self.profile.is_none()
    }

    /// Apply the supplied fields to `user`
    pub fn apply_to(&self, user: &mut UserProfile) {
        if let Some(nickname) = &self.nickname {
            user.nickname = Some(nickname.clone());
        }
        if let Some(avatar_url) = &self.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(tags) = &self.tags {
            user.tags = tags.clone();
        }
        if let Some(profile) = &self.profile {
            user.profile = Some(profile.clone());
        }
    }
}

/// Partial update of a team; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTeam {
    #[validate(length(min = 1, max = MAX_TEAM_NAME_CHARS))]
    pub name: Option<String>,

    #[validate(length(max = MAX_TEAM_DESCRIPTION_CHARS))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = MAX_TEAM_CAPACITY))]
    pub max_number: Option<i32>,

    pub status: Option<TeamStatus>,

    #[validate(length(max = MAX_TEAM_PASSWORD_CHARS))]
    pub password: Option<String>,

    #[validate(custom(function = "validate_future"))]
    pub expire_time: Option<DateTime<Utc>>,

    #[validate(length(max = MAX_TAGS), custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
}
