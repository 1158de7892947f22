//! Business-rule checks for team mutations
//!
//! Each check runs against state re-read under the operation's locks and
//! returns the error kind the caller sees: `Authorization` for captain-only
//! actions, `Validation` for every other rule.

use chrono::{DateTime, Utc};
use user_center_common::{verify_password, Error, Result};

use crate::domain::entities::{Team, TeamStatus, TeamUser};

/// Only the captain may update, dismiss, or transfer a team
pub fn ensure_captain(team: &Team, user_id: i64, action: &str) -> Result<()> {
    if !team.is_captain(user_id) {
        return Err(Error::Authorization(format!(
            "Only the captain can {} the team",
            action
        )));
    }
    Ok(())
}

/// The captain has to transfer or dismiss instead of leaving
pub fn ensure_not_captain(team: &Team, user_id: i64) -> Result<()> {
    if team.is_captain(user_id) {
        return Err(Error::Validation(
            "The captain cannot exit the team".to_string(),
        ));
    }
    Ok(())
}

/// Join rules, checked in order: duplicate membership, expiry, capacity,
/// visibility, password.
pub fn ensure_joinable(
    team: &Team,
    members: &[TeamUser],
    user_id: i64,
    password: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    if members.iter().any(|m| m.user_id == user_id) {
        return Err(Error::Validation("Already in team".to_string()));
    }

    if team.is_expired(now) {
        return Err(Error::Validation("Team has expired".to_string()));
    }

    if members.len() as i64 >= i64::from(team.max_number) {
        return Err(Error::Validation("Team is full".to_string()));
    }

    match team.status {
        TeamStatus::Public => Ok(()),
        TeamStatus::Private => Err(Error::Validation(
            "Private teams cannot be joined".to_string(),
        )),
        TeamStatus::Secret => ensure_password_matches(team, password),
    }
}

fn ensure_password_matches(team: &Team, password: Option<&str>) -> Result<()> {
    let candidate = password.filter(|p| !p.trim().is_empty());
    match (candidate, team.password.as_deref()) {
        (Some(candidate), Some(stored)) if verify_password(candidate, stored) => Ok(()),
        _ => Err(Error::Validation("Wrong password".to_string())),
    }
}

/// A capacity change may not drop below the live member count
pub fn ensure_capacity(new_max: i32, live_count: usize) -> Result<()> {
    if (live_count as i64) > i64::from(new_max) {
        return Err(Error::Validation(format!(
            "Max members cannot be less than the current {} members",
            live_count
        )));
    }
    Ok(())
}

/// Plain-text password for a secret team must be present and non-blank
pub fn require_secret_password(password: Option<&str>) -> Result<&str> {
    match password {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err(Error::Validation(
            "Secret teams require a password".to_string(),
        )),
    }
}
