//! Common test utilities for Trackfit
//!
//! Builds the real router over in-memory backends, with a mock identity
//! provider that knows three principals: two regular users and an admin.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use serde_json::Value;

use trackfit::{routes, AppState, Config, InMemoryDocumentStore};

use crate::mocks::{FaultyCache, MockIdentityServer};

/// Test configuration constants
pub mod constants {
    pub const IDENTITY_SECRET: &str = "sk_test_identity";

    pub const USER_TOKEN: &str = "sess_token_user";
    pub const USER_ID: &str = "user_1";

    pub const OTHER_TOKEN: &str = "sess_token_other";
    pub const OTHER_ID: &str = "user_2";

    pub const ADMIN_TOKEN: &str = "sess_token_admin";
    pub const ADMIN_ID: &str = "admin_1";
}

/// A running app plus handles on its backends
pub struct TestHarness {
    pub server: TestServer,
    pub identity: MockIdentityServer,
    pub store: InMemoryDocumentStore,
    pub cache: Arc<FaultyCache>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build the harness after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let identity = MockIdentityServer::start(constants::IDENTITY_SECRET).await;
        identity
            .mock_session(constants::USER_TOKEN, constants::USER_ID)
            .await;
        identity
            .mock_session(constants::OTHER_TOKEN, constants::OTHER_ID)
            .await;
        identity
            .mock_session(constants::ADMIN_TOKEN, constants::ADMIN_ID)
            .await;
        identity.mock_user(constants::USER_ID, None).await;
        identity.mock_user(constants::OTHER_ID, Some("member")).await;
        identity.mock_user(constants::ADMIN_ID, Some("admin")).await;

        let mut config = Config::for_identity(&identity.uri(), constants::IDENTITY_SECRET);
        adjust(&mut config);

        let store = InMemoryDocumentStore::new();
        let cache = Arc::new(FaultyCache::new(config.cache_ttl_seconds));
        let state = AppState::with_backends(config, cache.clone(), Arc::new(store.clone()))
            .expect("Failed to build app state");

        let app = routes::create_router(Arc::new(state));
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            identity,
            store,
            cache,
        }
    }

    pub fn get(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .get(path)
            .add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn post(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn put(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .put(path)
            .add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn patch(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .patch(path)
            .add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn delete(&self, path: &str, token: &str) -> TestRequest {
        self.server
            .delete(path)
            .add_header(header::AUTHORIZATION, bearer(token))
    }
}

pub fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {}", token)
        .parse()
        .expect("valid header value")
}

/// `_id` of a created record in a response payload
pub fn id_of(body: &Value, payload: &str) -> String {
    body[payload]["_id"]
        .as_str()
        .unwrap_or_else(|| panic!("no {}._id in {}", payload, body))
        .to_string()
}

/// Sample request bodies
pub mod test_data {
    use serde_json::{json, Value};

    pub fn expense(item: &str, price: f64, date: &str) -> Value {
        json!({ "item": item, "price": price, "category": "Food", "date": date })
    }

    /// `n` expenses dated on consecutive days of January 2024
    pub fn expense_batch(n: usize) -> Value {
        Value::Array(
            (1..=n)
                .map(|i| expense(&format!("item{}", i), i as f64, &format!("2024-01-{:02}", i)))
                .collect(),
        )
    }

    pub fn training(name: &str, is_public: bool) -> Value {
        json!({
            "trainingName": name,
            "category": "Strength",
            "trainingPlan": [{ "exercise": "squat", "sets": 5, "reps": 5 }],
            "isPublic": is_public
        })
    }

    pub fn todo(title: &str, tasks: &[&str]) -> Value {
        json!({
            "title": title,
            "tasks": tasks.iter().map(|t| json!({ "text": t })).collect::<Vec<_>>()
        })
    }
}
