//! Team lifecycle invariants under concurrency
//!
//! Capacity, uniqueness, cascade, captain-only actions, and the password and
//! expiry rules, exercised through `TeamService` with real parallelism.

use chrono::Utc;
use user_center_common::{Error, PageQuery};
use user_center_teams::{TeamStatus, UpdateTeam};

use crate::common::assertions::assert_validation;
use crate::common::{create_request, join_with_retry, TestApp};

/// Outcome tally of a batch of concurrent joins
#[derive(Debug, Default)]
struct JoinTally {
    accepted: usize,
    rejected: Vec<String>,
}

async fn concurrent_joins(
    app: &TestApp,
    team_id: i64,
    users: Vec<i64>,
    password: Option<&'static str>,
) -> JoinTally {
    let mut handles = Vec::with_capacity(users.len());
    for user_id in users {
        let service = app.service.clone();
        handles.push(tokio::spawn(async move {
            join_with_retry(&service, user_id, team_id, password).await
        }));
    }

    let mut tally = JoinTally::default();
    for handle in handles {
        match handle.await.expect("join task panicked") {
            Ok(_) => tally.accepted += 1,
            Err(Error::Validation(msg)) => tally.rejected.push(msg),
            Err(other) => panic!("unexpected join failure: {:?}", other),
        }
    }
    tally
}

mod test_capacity_invariants {
    use super::*;

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn test_concurrent_joiners_never_overfill_team() {
        const MAX_NUMBER: i32 = 6;
        const EXTRA: usize = 5;

        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let team = app
            .service
            .create(captain, create_request("Capacity", TeamStatus::Public, MAX_NUMBER))
            .await
            .unwrap();

        // The captain holds one seat already
        let joiners = app
            .create_users("joiner", MAX_NUMBER as usize - 1 + EXTRA)
            .await;
        let tally = concurrent_joins(&app, team.id, joiners, None).await;

        assert_eq!(tally.accepted, MAX_NUMBER as usize - 1);
        assert_eq!(tally.rejected.len(), EXTRA);
        assert!(tally.rejected.iter().all(|msg| msg == "Team is full"));

        let members = app.service.get(team.id).await.unwrap();
        assert_eq!(members.member_count, MAX_NUMBER as usize);
        assert_eq!(app.locks.held_count(), 0);
    }

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn test_two_racers_for_last_seat() {
        let app = TestApp::new();
        let a = app.create_user("a").await;
        let b = app.create_user("b").await;
        let c = app.create_user("c").await;

        let team = app
            .service
            .create(a, create_request("Pair", TeamStatus::Public, 2))
            .await
            .unwrap();
        assert_eq!(team.member_count, 1);

        let tally = concurrent_joins(&app, team.id, vec![b, c], None).await;

        assert_eq!(tally.accepted, 1);
        assert_eq!(tally.rejected, vec!["Team is full".to_string()]);
        assert_eq!(app.service.get(team.id).await.unwrap().member_count, 2);
    }

    #[tokio::test]
    async fn test_capacity_cannot_shrink_below_members() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let member = app.create_user("member").await;
        let team = app
            .service
            .create(captain, create_request("Shrink", TeamStatus::Public, 4))
            .await
            .unwrap();
        app.service.join(member, team.id, None).await.unwrap();

        let shrink = UpdateTeam {
            max_number: Some(1),
            ..Default::default()
        };
        assert_validation(
            app.service.update(captain, team.id, shrink).await,
            "Max members",
        );

        let exact = UpdateTeam {
            max_number: Some(2),
            ..Default::default()
        };
        tokio_test::assert_ok!(app.service.update(captain, team.id, exact).await);
    }
}

mod test_membership_invariants {
    use super::*;

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn test_same_user_concurrent_joins_yield_one_row() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let user = app.create_user("eager").await;
        let team = app
            .service
            .create(captain, create_request("Eager", TeamStatus::Public, 10))
            .await
            .unwrap();

        let tally = concurrent_joins(&app, team.id, vec![user; 8], None).await;

        assert_eq!(tally.accepted, 1);
        assert_eq!(tally.rejected.len(), 7);
        assert!(tally.rejected.iter().all(|msg| msg == "Already in team"));
        assert_eq!(app.service.get(team.id).await.unwrap().member_count, 2);
    }

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn test_dismiss_leaves_no_membership_rows() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let team = app
            .service
            .create(captain, create_request("Doomed", TeamStatus::Public, 20))
            .await
            .unwrap();
        let team_id = team.id;
        let joiners = app.create_users("late", 12).await;

        let mut handles = Vec::new();
        for user_id in joiners {
            let service = app.service.clone();
            handles.push(tokio::spawn(async move {
                join_with_retry(&service, user_id, team_id, None).await
            }));
        }

        let dismisser = app.service.clone();
        let dismissed = tokio::spawn(async move {
            loop {
                match dismisser.dismiss(captain, team_id).await {
                    Err(Error::Conflict(_)) => tokio::task::yield_now().await,
                    other => return other,
                }
            }
        });

        dismissed.await.unwrap().unwrap();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) | Err(Error::NotFound(_)) => {}
                Err(other) => panic!("unexpected join failure: {:?}", other),
            }
        }

        assert!(matches!(
            app.service.get(team_id).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(app.store.membership_count().await, 0);
    }

    #[tokio::test]
    async fn test_captain_exit_then_transfer_then_exit() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let b = app.create_user("b").await;
        let team = app
            .service
            .create(captain, create_request("Relay", TeamStatus::Public, 3))
            .await
            .unwrap();
        app.service.join(b, team.id, None).await.unwrap();

        assert_validation(app.service.exit(captain, team.id).await, "captain");

        let transferred = app.service.transfer(captain, team.id, b).await.unwrap();
        assert_eq!(transferred.user_id, b);

        app.service.exit(captain, team.id).await.unwrap();
        let remaining = app.service.get(team.id).await.unwrap();
        assert_eq!(remaining.member_count, 1);
        assert_eq!(remaining.members[0].id, b);
    }
}

mod test_captain_invariants {
    use super::*;

    #[tokio::test]
    async fn test_only_captain_may_update_dismiss_or_transfer() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let member = app.create_user("member").await;
        let team = app
            .service
            .create(captain, create_request("Guarded", TeamStatus::Public, 3))
            .await
            .unwrap();
        app.service.join(member, team.id, None).await.unwrap();

        assert!(matches!(
            app.service
                .update(member, team.id, UpdateTeam::default())
                .await,
            Err(Error::Authorization(_))
        ));
        assert!(matches!(
            app.service.dismiss(member, team.id).await,
            Err(Error::Authorization(_))
        ));
        assert!(matches!(
            app.service.transfer(member, team.id, member).await,
            Err(Error::Authorization(_))
        ));

        let unchanged = app.service.get(team.id).await.unwrap();
        assert_eq!(unchanged.user_id, captain);
        assert_eq!(unchanged.member_count, 2);
    }
}

mod test_join_rules {
    use super::*;

    #[tokio::test]
    async fn test_secret_team_password_scenario() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let guest = app.create_user("guest").await;

        let mut request = create_request("Vault", TeamStatus::Secret, 3);
        request.password = Some("abc123".to_string());
        let team = app.service.create(captain, request).await.unwrap();

        assert_validation(
            app.service.join(guest, team.id, Some("wrong")).await,
            "Wrong password",
        );
        assert_validation(app.service.join(guest, team.id, None).await, "Wrong password");

        let joined = app.service.join(guest, team.id, Some("abc123")).await.unwrap();
        assert_eq!(joined.member_count, 2);
    }

    #[tokio::test]
    async fn test_secret_team_wrong_password_when_full_or_expired() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let guest = app.create_user("guest").await;

        let mut request = create_request("Closed Vault", TeamStatus::Secret, 1);
        request.password = Some("abc123".to_string());
        let team = app.service.create(captain, request).await.unwrap();

        // Full: only the captain's seat exists
        assert!(matches!(
            app.service.join(guest, team.id, Some("wrong")).await,
            Err(Error::Validation(_))
        ));

        let mut stored = app
            .service
            .repos()
            .teams
            .get_by_id(team.id)
            .await
            .unwrap()
            .unwrap();
        stored.max_number = 5;
        stored.expire_time = Utc::now() - chrono::Duration::hours(1);
        app.service.repos().teams.update(&stored).await.unwrap();

        assert!(matches!(
            app.service.join(guest, team.id, Some("wrong")).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            app.service.join(guest, team.id, None).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_team_rejected_with_capacity_left() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;
        let guest = app.create_user("guest").await;
        let team = app
            .service
            .create(captain, create_request("Stale", TeamStatus::Public, 10))
            .await
            .unwrap();

        let mut stored = app
            .service
            .repos()
            .teams
            .get_by_id(team.id)
            .await
            .unwrap()
            .unwrap();
        stored.expire_time = Utc::now() - chrono::Duration::minutes(1);
        app.service.repos().teams.update(&stored).await.unwrap();

        assert_validation(app.service.join(guest, team.id, None).await, "expired");
    }
}

mod test_search_round_trip {
    use super::*;

    #[tokio::test]
    async fn test_tagged_team_found_then_gone_after_dismiss() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;

        let mut request = create_request("Tagged", TeamStatus::Public, 4);
        request.tags = vec!["a".to_string(), "b".to_string()];
        let team = app.service.create(captain, request).await.unwrap();

        let page = app
            .service
            .search(Some("a"), &PageQuery::default())
            .await
            .unwrap();
        assert!(page.records.iter().any(|t| t.id == team.id));

        app.service.dismiss(captain, team.id).await.unwrap();

        let page = app
            .service
            .search(Some("a"), &PageQuery::default())
            .await
            .unwrap();
        assert!(page.records.iter().all(|t| t.id != team.id));
        assert!(app
            .service
            .repos()
            .memberships
            .list_by_team(team.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_hides_private_secret_and_expired() {
        let app = TestApp::new();
        let captain = app.create_user("captain").await;

        app.service
            .create(captain, create_request("Open Rust", TeamStatus::Public, 4))
            .await
            .unwrap();
        app.service
            .create(captain, create_request("Closed Rust", TeamStatus::Private, 4))
            .await
            .unwrap();
        let mut secret = create_request("Hidden Rust", TeamStatus::Secret, 4);
        secret.password = Some("pw".to_string());
        app.service.create(captain, secret).await.unwrap();

        let stale = app
            .service
            .create(captain, create_request("Stale Rust", TeamStatus::Public, 4))
            .await
            .unwrap();
        let mut stored = app
            .service
            .repos()
            .teams
            .get_by_id(stale.id)
            .await
            .unwrap()
            .unwrap();
        stored.expire_time = Utc::now() - chrono::Duration::hours(1);
        app.service.repos().teams.update(&stored).await.unwrap();

        let page = app
            .service
            .search(Some("rust"), &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].name, "Open Rust");
    }
}
