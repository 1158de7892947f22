//! Membership repository

use async_trait::async_trait;
use sqlx::PgPool;
use user_center_common::{Error, RepositoryError, Result};

use super::MembershipStore;
use crate::domain::entities::TeamUser;

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    async fn insert(&self, team_id: i64, user_id: i64) -> Result<TeamUser> {
        let row = sqlx::query_as::<_, TeamUser>(
            r#"
            INSERT INTO team_user (team_id, user_id)
            VALUES ($1, $2)
            RETURNING id, team_id, user_id, join_time
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::AlreadyExists => Error::Validation("Already in team".to_string()),
            other => other.into(),
        })?;

        Ok(row)
    }

    async fn remove(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM team_user WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_team(&self, team_id: i64) -> Result<Vec<TeamUser>> {
        let rows = sqlx::query_as::<_, TeamUser>(
            r#"
            SELECT id, team_id, user_id, join_time
            FROM team_user
            WHERE team_id = $1
            ORDER BY join_time ASC, id ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<TeamUser>> {
        let rows = sqlx::query_as::<_, TeamUser>(
            r#"
            SELECT id, team_id, user_id, join_time
            FROM team_user
            WHERE user_id = $1
            ORDER BY team_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
