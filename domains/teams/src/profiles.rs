//! User profiles: lookup, search, self-service edits, and tag matching

use std::cmp::Reverse;
use std::sync::Arc;

use user_center_common::{Error, Page, PageQuery, Result};
use validator::Validate;

use crate::domain::entities::{UpdateProfile, UserFilter, UserProfile, MAX_MATCH_USERS};
use crate::repository::UserDirectory;

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserDirectory>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    pub async fn get(&self, user_id: i64) -> Result<UserProfile> {
        if user_id <= 0 {
            return Err(Error::Validation("Invalid user id".to_string()));
        }
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Users by nickname substring, or carrying every given tag
    pub async fn search(&self, filter: &UserFilter, page: &PageQuery) -> Result<Page<UserProfile>> {
        let (users, total) = self.users.search_users(filter, page).await?;
        Ok(Page::new(users, total, page))
    }

    /// Edit the caller's own profile
    pub async fn update(&self, caller: i64, changes: UpdateProfile) -> Result<UserProfile> {
        changes
            .validate()
            .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;

        if changes.is_empty() {
            return self.get(caller).await;
        }

        let user = self
            .users
            .update_profile(caller, &changes)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = caller, "Profile updated");
        Ok(user)
    }

    /// Up to `num` other users ranked by how many of the caller's tags they
    /// share, ties broken by id
    pub async fn match_users(&self, caller: i64, num: usize) -> Result<Vec<UserProfile>> {
        if num == 0 || num > MAX_MATCH_USERS {
            return Err(Error::Validation(format!(
                "Match count must be between 1 and {}",
                MAX_MATCH_USERS
            )));
        }

        let me = self.get(caller).await?;
        if me.tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = self.users.list_sharing_tags(caller, &me.tags).await?;
        candidates.sort_by_key(|user| (Reverse(user.shared_tag_count(&me.tags)), user.id));
        candidates.truncate(num);
        Ok(candidates)
    }
}
