//! Mock identity provider for testing
//!
//! Provides wiremock-based mocks for the identity API endpoints:
//! - POST /v1/sessions/verify - Verify a session token
//! - GET /v1/users/{id} - Look up a user and their role
//!
//! # Example
//!
//! ```rust,ignore
//! let identity = MockIdentityServer::start().await;
//! identity.mock_session("token_abc", "user_1").await;
//! identity.mock_user("user_1", Some("admin")).await;
//! // Use identity.uri() as IDENTITY_API_URL
//! ```

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Path of the session verification endpoint
pub const VERIFY_PATH: &str = "/v1/sessions/verify";

/// Mock identity server wrapper
pub struct MockIdentityServer {
    server: MockServer,
    secret_key: String,
}

impl MockIdentityServer {
    /// Start a mock server expecting `secret_key` on every call
    pub async fn start(secret_key: &str) -> Self {
        let server = MockServer::start().await;

        // Anything not explicitly mocked is an unknown session
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "session not found"
            })))
            .with_priority(10)
            .mount(&server)
            .await;

        Self {
            server,
            secret_key: secret_key.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// All requests received so far
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of session verification calls received so far
    pub async fn verify_calls(&self) -> usize {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.url.path() == VERIFY_PATH)
            .count()
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    // =========================================================================
    // POST /v1/sessions/verify
    // =========================================================================

    /// Verify `token` as a session of `user_id`
    pub async fn mock_session(&self, token: &str, user_id: &str) {
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .and(header("authorization", self.bearer().as_str()))
            .and(body_json(json!({ "token": token })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userId": user_id,
                "sessionId": format!("sess_{}", user_id),
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail verification with a server error
    pub async fn mock_verify_unavailable(&self) {
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // GET /v1/users/{id}
    // =========================================================================

    /// Serve `user_id` with an optional role
    pub async fn mock_user(&self, user_id: &str, role: Option<&str>) {
        let metadata = match role {
            Some(role) => json!({ "role": role }),
            None => json!({}),
        };

        Mock::given(method("GET"))
            .and(path(format!("/v1/users/{}", user_id)))
            .and(header("authorization", self.bearer().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "publicMetadata": metadata,
            })))
            .mount(&self.server)
            .await;
    }
}
