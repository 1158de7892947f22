//! Postgres repository tests
//!
//! Run against a live database with
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use user_center_common::{Error, PageQuery};
use user_center_lock::{InMemoryLockProvider, LockManager, LockPolicy};
use user_center_teams::{
    MembershipRepository, MembershipStore, NewTeam, TeamRepository, TeamService, TeamStatus,
    TeamStore, TeamsRepositories, UpdateProfile, UserDirectory, UserFilter, UserRepository,
};
use uuid::Uuid;

use crate::common::create_request;

async fn connect() -> anyhow::Result<PgPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))?;
    let pool = PgPool::connect(&url).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    Ok(pool)
}

async fn insert_user(pool: &PgPool, prefix: &str) -> anyhow::Result<i64> {
    let account = format!("{}-{}", prefix, Uuid::new_v4().simple());
    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO "user" (account, password, nickname) VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(&account)
    .bind("not-a-real-hash")
    .bind(prefix)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

fn new_team(name: &str, captain: i64) -> NewTeam {
    NewTeam {
        name: name.to_string(),
        description: Some("postgres test team".to_string()),
        max_number: 3,
        status: TeamStatus::Public,
        password: None,
        expire_time: Utc::now() + chrono::Duration::days(1),
        user_id: captain,
        tags: vec!["pg".to_string()],
    }
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_create_with_captain_and_delete_cascade() -> anyhow::Result<()> {
    let pool = connect().await?;
    let teams = TeamRepository::new(pool.clone());
    let memberships = MembershipRepository::new(pool.clone());
    let captain = insert_user(&pool, "captain").await?;

    let team = teams.create_with_captain(&new_team("Cascade", captain)).await?;
    let rows = memberships.list_by_team(team.id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, captain);

    assert!(teams.delete_cascade(team.id).await?);
    assert!(teams.get_by_id(team.id).await?.is_none());
    assert!(memberships.list_by_team(team.id).await?.is_empty());
    assert!(!teams.delete_cascade(team.id).await?);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_duplicate_membership_is_validation() -> anyhow::Result<()> {
    let pool = connect().await?;
    let teams = TeamRepository::new(pool.clone());
    let memberships = MembershipRepository::new(pool.clone());
    let captain = insert_user(&pool, "captain").await?;
    let member = insert_user(&pool, "member").await?;

    let team = teams.create_with_captain(&new_team("Unique", captain)).await?;
    memberships.insert(team.id, member).await?;

    match memberships.insert(team.id, member).await {
        Err(Error::Validation(msg)) => assert_eq!(msg, "Already in team"),
        other => panic!("expected duplicate rejection, got {:?}", other),
    }
    assert!(memberships.remove(team.id, member).await?);
    assert!(!memberships.remove(team.id, member).await?);

    teams.delete_cascade(team.id).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_search_matches_tags_and_skips_hidden() -> anyhow::Result<()> {
    let pool = connect().await?;
    let teams = TeamRepository::new(pool.clone());
    let captain = insert_user(&pool, "searcher").await?;
    let tag = format!("tag{}", Uuid::new_v4().simple());

    let mut open = new_team("Open", captain);
    open.tags = vec![tag.clone()];
    let open = teams.create_with_captain(&open).await?;

    let mut private = new_team("Closed", captain);
    private.status = TeamStatus::Private;
    private.tags = vec![tag.clone()];
    let private = teams.create_with_captain(&private).await?;

    let (records, total) = teams
        .search(Some(&tag.to_uppercase()), Utc::now(), &PageQuery::default())
        .await?;
    assert_eq!(total, 1);
    assert_eq!(records[0].id, open.id);

    teams.delete_cascade(open.id).await?;
    teams.delete_cascade(private.id).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_set_captain_touches_one_team() -> anyhow::Result<()> {
    let pool = connect().await?;
    let teams = TeamRepository::new(pool.clone());
    let captain = insert_user(&pool, "captain").await?;
    let heir = insert_user(&pool, "heir").await?;

    let first = teams.create_with_captain(&new_team("First", captain)).await?;
    let second = teams.create_with_captain(&new_team("Second", captain)).await?;

    let moved = teams.set_captain(first.id, heir).await?;
    assert_eq!(moved.user_id, heir);
    let untouched = teams.get_by_id(second.id).await?.expect("second team");
    assert_eq!(untouched.user_id, captain);

    let managed: Vec<i64> = teams
        .list_by_captain(captain)
        .await?
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(managed, vec![second.id]);

    teams.delete_cascade(first.id).await?;
    teams.delete_cascade(second.id).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_user_profiles_keep_requested_order() -> anyhow::Result<()> {
    let pool = connect().await?;
    let users = UserRepository::new(pool.clone());
    let a = insert_user(&pool, "a").await?;
    let b = insert_user(&pool, "b").await?;

    let profiles = users.list_profiles(&[b, a]).await?;
    let ids: Vec<i64> = profiles.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![b, a]);
    assert!(users.get_by_id(-1).await?.is_none());
    Ok(())
}

/// Give `user_id` a nickname and tags through the directory
async fn tag_user(
    users: &UserRepository,
    user_id: i64,
    nickname: &str,
    tags: &[&str],
) -> anyhow::Result<()> {
    let changes = UpdateProfile {
        nickname: Some(nickname.to_string()),
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        ..Default::default()
    };
    users.update_profile(user_id, &changes).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_update_profile_keeps_account() -> anyhow::Result<()> {
    let pool = connect().await?;
    let users = UserRepository::new(pool.clone());
    let id = insert_user(&pool, "editor").await?;
    let before = users.get_by_id(id).await?.expect("inserted user");

    let changes = UpdateProfile {
        profile: Some("hello".to_string()),
        gender: Some(2),
        ..Default::default()
    };
    let after = users.update_profile(id, &changes).await?.expect("updated user");
    assert_eq!(after.account, before.account);
    assert_eq!(after.create_time, before.create_time);
    assert_eq!(after.nickname, before.nickname);
    assert_eq!(after.profile.as_deref(), Some("hello"));
    assert_eq!(after.gender, Some(2));

    assert!(users.update_profile(-1, &changes).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_search_users_requires_every_tag() -> anyhow::Result<()> {
    let pool = connect().await?;
    let users = UserRepository::new(pool.clone());
    let marker = format!("t{}", Uuid::new_v4().simple());
    let other = format!("o{}", Uuid::new_v4().simple());

    let both = insert_user(&pool, "both").await?;
    let one = insert_user(&pool, "one").await?;
    tag_user(&users, both, &format!("{}-Both", marker), &[&marker, &other]).await?;
    tag_user(&users, one, &format!("{}-One", marker), &[&marker]).await?;

    let filter = UserFilter::new(None, &[marker.clone(), other.clone()]);
    let (records, total) = users.search_users(&filter, &PageQuery::default()).await?;
    assert_eq!(total, 1);
    assert_eq!(records[0].id, both);

    let filter = UserFilter::new(Some(&marker.to_uppercase()), &[]);
    let (records, total) = users.search_users(&filter, &PageQuery::new(2, 1)).await?;
    assert_eq!(total, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, one);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_list_sharing_tags_excludes_caller() -> anyhow::Result<()> {
    let pool = connect().await?;
    let users = UserRepository::new(pool.clone());
    let tag = format!("m{}", Uuid::new_v4().simple());

    let me = insert_user(&pool, "me").await?;
    let peer = insert_user(&pool, "peer").await?;
    let stranger = insert_user(&pool, "stranger").await?;
    tag_user(&users, me, "me", &[&tag]).await?;
    tag_user(&users, peer, "peer", &[&tag, "extra"]).await?;
    tag_user(&users, stranger, "stranger", &["unrelated"]).await?;

    let shared: Vec<i64> = users
        .list_sharing_tags(me, &[tag.clone()])
        .await?
        .iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(shared, vec![peer]);
    assert!(users.list_sharing_tags(me, &[]).await?.is_empty());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
#[ignore = "requires Postgres"]
async fn test_service_capacity_holds_on_postgres() -> anyhow::Result<()> {
    let pool = connect().await?;
    let locks = LockManager::new(Arc::new(InMemoryLockProvider::new()), LockPolicy::default());
    let service = TeamService::new(TeamsRepositories::new(pool.clone()), locks);

    let captain = insert_user(&pool, "captain").await?;
    let team = service
        .create(captain, create_request("Seats", TeamStatus::Public, 3))
        .await?;

    let mut handles = Vec::new();
    for n in 0..6 {
        let user_id = insert_user(&pool, &format!("joiner{}", n)).await?;
        let service = service.clone();
        let team_id = team.id;
        handles.push(tokio::spawn(async move {
            crate::common::join_with_retry(&service, user_id, team_id, None).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => accepted += 1,
            Err(Error::Validation(msg)) => assert_eq!(msg, "Team is full"),
            Err(other) => panic!("unexpected join failure: {:?}", other),
        }
    }
    assert_eq!(accepted, 2);
    assert_eq!(service.get(team.id).await?.member_count, 3);

    service.dismiss(captain, team.id).await?;
    Ok(())
}
