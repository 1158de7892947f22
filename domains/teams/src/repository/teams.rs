//! Team repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use user_center_common::{PageQuery, RepositoryError, Result};

use super::transactions::{
    create_membership_tx, create_team_tx, delete_memberships_for_team_tx, delete_team_tx,
    TEAM_COLUMNS,
};
use super::{like_pattern, normalize_keyword, TeamStore};
use crate::domain::entities::{NewTeam, Team, TeamStatus};

/// Filter shared by the search page and its count: public, unexpired, and
/// an optional ILIKE pattern over name, description, and tags
const SEARCH_FILTER: &str = r#"
    status = $1
    AND expire_time > $2
    AND ($3::TEXT IS NULL
         OR name ILIKE $3
         OR description ILIKE $3
         OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $3))
"#;

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamStore for TeamRepository {
    async fn get_by_id(&self, team_id: i64) -> Result<Option<Team>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team WHERE id = $1");
        let row = sqlx::query_as::<_, Team>(&sql)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn create_with_captain(&self, team: &NewTeam) -> Result<Team> {
        let mut tx = self.pool.begin().await?;

        let created = create_team_tx(&mut tx, team).await?;
        create_membership_tx(&mut tx, created.id, created.user_id).await?;

        tx.commit().await?;

        tracing::debug!(team_id = created.id, user_id = created.user_id, "Inserted team with captain");
        Ok(created)
    }

    async fn update(&self, team: &Team) -> Result<Team> {
        let sql = format!(
            r#"
            UPDATE team
            SET name = $2, description = $3, max_number = $4, status = $5,
                password = $6, expire_time = $7, tags = $8, update_time = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Team>(&sql)
            .bind(team.id)
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.max_number)
            .bind(team.status)
            .bind(&team.password)
            .bind(team.expire_time)
            .bind(&team.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(updated)
    }

    async fn set_captain(&self, team_id: i64, user_id: i64) -> Result<Team> {
        let sql = format!(
            r#"
            UPDATE team
            SET user_id = $2, update_time = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Team>(&sql)
            .bind(team_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(updated)
    }

    async fn delete_cascade(&self, team_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let existed = delete_team_tx(&mut tx, team_id).await?;
        let removed = delete_memberships_for_team_tx(&mut tx, team_id).await?;

        tx.commit().await?;

        tracing::debug!(team_id, existed, memberships_removed = removed, "Deleted team");
        Ok(existed)
    }

    async fn list_by_captain(&self, user_id: i64) -> Result<Vec<Team>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team WHERE user_id = $1 ORDER BY id ASC");
        let rows = sqlx::query_as::<_, Team>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list_by_ids(&self, team_ids: &[i64]) -> Result<Vec<Team>> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {TEAM_COLUMNS} FROM team WHERE id = ANY($1) ORDER BY id ASC");
        let rows = sqlx::query_as::<_, Team>(&sql)
            .bind(team_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn search(
        &self,
        keyword: Option<&str>,
        now: DateTime<Utc>,
        page: &PageQuery,
    ) -> Result<(Vec<Team>, i64)> {
        let pattern = normalize_keyword(keyword).map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) FROM team WHERE {SEARCH_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(TeamStatus::Public)
            .bind(now)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            "SELECT {TEAM_COLUMNS} FROM team WHERE {SEARCH_FILTER} \
             ORDER BY id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, Team>(&page_sql)
            .bind(TeamStatus::Public)
            .bind(now)
            .bind(&pattern)
            .bind(page.page_size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }
}
