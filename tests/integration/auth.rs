//! Authentication integration tests
//!
//! Every `/api/v1` route requires a bearer session token verified by the
//! identity provider. Verified sessions are cached by token hash.

use axum::http::{header, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;

use trackfit::store::Filter;
use trackfit::DocumentStore;

use crate::common::{bearer, constants::*, TestHarness};

#[tokio::test]
async fn test_missing_authorization_header() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/api/v1/expense").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "User not authenticated");
    assert_eq!(harness.identity.verify_calls().await, 0);
}

#[tokio::test]
async fn test_non_bearer_authorization_header() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/api/v1/expense")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["message"], "Invalid authentication token");
}

#[tokio::test]
async fn test_unknown_session_token() {
    let harness = TestHarness::new().await;

    let response = harness.get("/api/v1/expense", "not_a_session").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(harness.identity.verify_calls().await, 1);
}

#[tokio::test]
async fn test_session_without_user_id_is_rejected() {
    let harness = TestHarness::new().await;
    harness.identity.mock_session("sess_token_blank", "").await;

    let response = harness
        .post("/api/v1/todo", "sess_token_blank")
        .json(&serde_json::json!({ "title": "Orphan" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["message"], "Invalid authentication token");
    let stored = harness
        .store
        .count("todos", &Filter::all())
        .await
        .expect("store count");
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_identity_outage_is_server_error() {
    let harness = TestHarness::new().await;
    harness.identity.mock_verify_unavailable().await;

    let response = harness.get("/api/v1/expense", USER_TOKEN).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(
        json["message"],
        "Something went wrong while processing the request"
    );
}

#[tokio::test]
async fn test_verified_session_is_cached() {
    let harness = TestHarness::new().await;

    // No records yet, so both calls fail past authentication
    let first = harness.get("/api/v1/expense", USER_TOKEN).await;
    let second = harness.get("/api/v1/expense", USER_TOKEN).await;

    first.assert_status(StatusCode::BAD_REQUEST);
    second.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.identity.verify_calls().await, 1);
}

#[tokio::test]
async fn test_sessions_are_cached_per_token() {
    let harness = TestHarness::new().await;

    harness.get("/api/v1/todo", USER_TOKEN).await;
    harness.get("/api/v1/todo", OTHER_TOKEN).await;
    harness
        .server
        .get("/api/v1/todo")
        .add_header(header::AUTHORIZATION, bearer(USER_TOKEN))
        .await;

    assert_eq!(harness.identity.verify_calls().await, 2);
}
