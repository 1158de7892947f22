//! Common test utilities and fixtures for integration tests
//!
//! Every [`TestApp`] is isolated: its own in-memory store, its own lock
//! provider, and a router wired exactly like the production one.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use user_center_auth::{issue_token, AuthBackend, AuthConfig};
use user_center_common::{Error, Result};
use user_center_lock::{InMemoryLockProvider, LockManager, LockPolicy};
use user_center_teams::{
    CreateTeam, InMemoryStore, TeamService, TeamStatus, TeamView, TeamsRepositories, TeamsState,
    UserProfile,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only";

/// Test application with in-memory collaborators
pub struct TestApp {
    pub service: TeamService,
    pub store: Arc<InMemoryStore>,
    pub locks: Arc<InMemoryLockProvider>,
    pub auth: AuthBackend,
    next_user_id: AtomicI64,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let locks = Arc::new(InMemoryLockProvider::new());
        let manager = LockManager::new(locks.clone(), LockPolicy::default());

        Self {
            service: TeamService::new(TeamsRepositories::in_memory(store.clone()), manager),
            store,
            locks,
            auth: AuthBackend::new(AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_string(),
                issuer: Some("user-center-test".to_string()),
                audience: Some("authenticated".to_string()),
            }),
            next_user_id: AtomicI64::new(0),
        }
    }

    /// Register a user and return its id
    pub async fn create_user(&self, account: &str) -> i64 {
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.insert_user(UserProfile::new(id, account)).await;
        id
    }

    /// Register a user with a nickname and tags and return its id
    pub async fn create_tagged_user(&self, account: &str, nickname: &str, tags: &[&str]) -> i64 {
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut profile = UserProfile::new(id, account);
        profile.nickname = Some(nickname.to_string());
        profile.tags = tags.iter().map(|t| t.to_string()).collect();
        self.store.insert_user(profile).await;
        id
    }

    /// Register `count` users named `{prefix}-{n}`
    pub async fn create_users(&self, prefix: &str, count: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            ids.push(self.create_user(&format!("{}-{}", prefix, n)).await);
        }
        ids
    }

    pub fn router(&self) -> Router {
        user_center_app::build_router(TeamsState::new(
            self.service.clone(),
            self.auth.clone(),
        ))
    }

    pub fn token(&self, user_id: i64) -> String {
        issue_token(
            self.auth.config(),
            user_id,
            Some(format!("user-{}", user_id)),
            chrono::Duration::hours(1),
        )
        .expect("test token should sign")
    }

    /// Send one request through the router; returns status and JSON body
    /// (`Value::Null` for empty bodies)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(user_id)),
            );
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid creation request expiring in a week
pub fn create_request(name: &str, status: TeamStatus, max_number: i32) -> CreateTeam {
    CreateTeam {
        name: name.to_string(),
        description: Some(format!("{} description", name)),
        max_number,
        status,
        password: None,
        expire_time: Utc::now() + chrono::Duration::days(7),
        tags: vec![],
    }
}

/// Join, retrying the whole operation while the team is contended.
/// Any other outcome is returned as is.
pub async fn join_with_retry(
    service: &TeamService,
    user_id: i64,
    team_id: i64,
    password: Option<&str>,
) -> Result<TeamView> {
    loop {
        match service.join(user_id, team_id, password).await {
            Err(Error::Conflict(_)) => tokio::time::sleep(Duration::from_millis(1)).await,
            other => return other,
        }
    }
}

/// Common assertions
pub mod assertions {
    use super::*;

    pub fn assert_error_code(body: &Value, expected: &str) {
        assert_eq!(
            body["error"]["code"].as_str(),
            Some(expected),
            "unexpected error body: {}",
            body
        );
    }

    pub fn assert_validation<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
        match result {
            Err(Error::Validation(msg)) => {
                assert!(msg.contains(expected), "unexpected message: {}", msg)
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
