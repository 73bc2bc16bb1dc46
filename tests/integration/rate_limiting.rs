//! Rate limiting integration tests
//!
//! Requests under `/api/v1` are limited per client address. Health and
//! metrics endpoints are never limited.

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{constants::*, TestHarness};

async fn limited_harness(max_requests: u32) -> TestHarness {
    TestHarness::with_config(|config| {
        config.rate_limit_enabled = true;
        config.rate_limit_max_requests = max_requests;
        config.rate_limit_window_seconds = 60;
    })
    .await
}

#[tokio::test]
async fn test_requests_over_limit_are_rejected() {
    let harness = limited_harness(2).await;

    for _ in 0..2 {
        let response = harness.get("/api/v1/todo", USER_TOKEN).await;
        assert_ne!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    let response = harness.get("/api/v1/todo", USER_TOKEN).await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Too many requests, please try again later");
    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .to_str()
        .expect("ascii header")
        .parse()
        .expect("numeric Retry-After");
    assert!(retry_after >= 1);
}

#[tokio::test]
async fn test_rejected_requests_skip_authentication() {
    let harness = limited_harness(1).await;

    harness.get("/api/v1/todo", USER_TOKEN).await;
    harness
        .get("/api/v1/todo", OTHER_TOKEN)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(harness.identity.verify_calls().await, 1);
}

#[tokio::test]
async fn test_health_is_not_limited() {
    let harness = limited_harness(1).await;

    for _ in 0..3 {
        harness.server.get("/health/live").await.assert_status_ok();
    }
}

#[tokio::test]
async fn test_disabled_by_default() {
    let harness = TestHarness::new().await;

    for _ in 0..5 {
        let response = harness.get("/api/v1/todo", USER_TOKEN).await;
        assert_ne!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
