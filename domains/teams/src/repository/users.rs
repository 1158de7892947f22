//! User repository
//!
//! Registration and login are handled elsewhere; this side reads profiles and
//! edits the profile columns. Only the credential-free columns are ever
//! selected.

use async_trait::async_trait;
use sqlx::PgPool;
use user_center_common::{PageQuery, Result};

use super::{like_pattern, UserDirectory};
use crate::domain::entities::{UpdateProfile, UserFilter, UserProfile};

/// `$1` nickname ILIKE pattern or NULL, `$2` required tags (empty for none)
const USER_FILTER: &str = r#"
    ($1::text IS NULL OR nickname ILIKE $1)
    AND (cardinality($2::text[]) = 0 OR tags @> $2::text[])
"#;

fn filter_binds(filter: &UserFilter) -> (Option<String>, Vec<String>) {
    match filter {
        UserFilter::All => (None, Vec::new()),
        UserFilter::Nickname(nickname) => (Some(like_pattern(nickname)), Vec::new()),
        UserFilter::Tags(tags) => (None, tags.clone()),
    }
}

const PROFILE_COLUMNS: &str = "id, account, nickname, avatar_url, gender, tags, profile, create_time";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn get_by_id(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let sql = format!(r#"SELECT {PROFILE_COLUMNS} FROM "user" WHERE id = $1"#);
        let user = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list_profiles(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        // array_position keeps the caller's ordering (membership join order)
        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS} FROM "user"
            WHERE id = ANY($1)
            ORDER BY array_position($1, id)
            "#
        );
        let users = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn search_users(
        &self,
        filter: &UserFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserProfile>, i64)> {
        let (nickname, tags) = filter_binds(filter);

        let count_sql = format!(r#"SELECT COUNT(*) FROM "user" WHERE {USER_FILTER}"#);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&nickname)
            .bind(&tags)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS} FROM "user"
            WHERE {USER_FILTER}
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#
        );
        let users = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(&nickname)
            .bind(&tags)
            .bind(page.page_size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        changes: &UpdateProfile,
    ) -> Result<Option<UserProfile>> {
        // account and create_time are never written
        let sql = format!(
            r#"
            UPDATE "user" SET
                nickname = COALESCE($2, nickname),
                avatar_url = COALESCE($3, avatar_url),
                gender = COALESCE($4, gender),
                tags = COALESCE($5, tags),
                profile = COALESCE($6, profile),
                update_time = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .bind(&changes.nickname)
            .bind(&changes.avatar_url)
            .bind(changes.gender)
            .bind(&changes.tags)
            .bind(&changes.profile)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list_sharing_tags(&self, user_id: i64, tags: &[String]) -> Result<Vec<UserProfile>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS} FROM "user"
            WHERE id <> $1 AND tags && $2::text[]
            ORDER BY id
            "#
        );
        let users = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .bind(tags)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}
