//! Transactional free functions for the Teams domain (Zero2Prod pattern)

use sqlx::{Postgres, Transaction};

use crate::domain::entities::{NewTeam, Team, TeamUser};

pub(crate) const TEAM_COLUMNS: &str = "id, name, description, max_number, status, password, \
     expire_time, user_id, tags, create_time, update_time";

/// Create a team within an existing transaction.
pub async fn create_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team: &NewTeam,
) -> std::result::Result<Team, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO team (name, description, max_number, status, password,
                          expire_time, user_id, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {TEAM_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Team>(&sql)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.max_number)
        .bind(team.status)
        .bind(&team.password)
        .bind(team.expire_time)
        .bind(team.user_id)
        .bind(&team.tags)
        .fetch_one(&mut **transaction)
        .await
}

/// Create a membership within an existing transaction.
pub async fn create_membership_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: i64,
    user_id: i64,
) -> std::result::Result<TeamUser, sqlx::Error> {
    sqlx::query_as::<_, TeamUser>(
        r#"
        INSERT INTO team_user (team_id, user_id)
        VALUES ($1, $2)
        RETURNING id, team_id, user_id, join_time
        "#,
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(&mut **transaction)
    .await
}

/// Delete all memberships of a team within an existing transaction.
///
/// Returns the number of rows removed.
pub async fn delete_memberships_for_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: i64,
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_user WHERE team_id = $1")
        .bind(team_id)
        .execute(&mut **transaction)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a team within an existing transaction.
///
/// Returns whether the team row existed.
pub async fn delete_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: i64,
) -> std::result::Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team WHERE id = $1")
        .bind(team_id)
        .execute(&mut **transaction)
        .await?;
    Ok(result.rows_affected() > 0)
}
