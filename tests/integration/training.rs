//! Training plan endpoint integration tests
//!
//! Private plans belong to their owner; public plans are managed by admins
//! and listed to everyone through `/training/public`.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use trackfit::cache::keys;
use trackfit::resources::ResourceKind;
use trackfit::CacheBackend;

use crate::common::{constants::*, id_of, test_data, TestHarness};

const PATH: &str = "/api/v1/training";

async fn create_plan(harness: &TestHarness, token: &str, name: &str, public: bool) -> Value {
    let response = harness
        .post(PATH, token)
        .json(&test_data::training(name, public))
        .await;
    response.assert_status_ok();
    response.json()
}

async fn cached(harness: &TestHarness, user_id: &str) -> bool {
    harness
        .cache
        .exists(&keys::list(ResourceKind::Training, user_id))
        .await
        .expect("cache read")
}

/// A private plan owned by USER, made public by ADMIN
async fn public_plan_of_user(harness: &TestHarness) -> String {
    let created = create_plan(harness, USER_TOKEN, "Shared", false).await;
    let id = id_of(&created, "training");
    harness
        .patch(&format!("{}/{}", PATH, id), ADMIN_TOKEN)
        .json(&json!({ "isPublic": true }))
        .await
        .assert_status_ok();
    id
}

#[tokio::test]
async fn test_create_private_plan() {
    let harness = TestHarness::new().await;

    let json = create_plan(&harness, USER_TOKEN, "Leg Day", false).await;

    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Training plan created successfully");
    assert_eq!(json["training"]["trainingName"], "leg day");
    assert_eq!(json["training"]["category"], "strength");
    assert_eq!(json["training"]["isPublic"], false);
    assert_eq!(json["training"]["userId"], USER_ID);
}

#[tokio::test]
async fn test_non_admin_cannot_create_public_plan() {
    let harness = TestHarness::new().await;

    let json = create_plan(&harness, OTHER_TOKEN, "Open Plan", true).await;

    assert_eq!(json["training"]["isPublic"], false);
}

#[tokio::test]
async fn test_admin_creates_public_plan() {
    let harness = TestHarness::new().await;

    let json = create_plan(&harness, ADMIN_TOKEN, "Starter", true).await;

    assert_eq!(json["training"]["isPublic"], true);
}

#[tokio::test]
async fn test_create_requires_all_fields() {
    let harness = TestHarness::new().await;

    let response = harness
        .post(PATH, USER_TOKEN)
        .json(&json!({ "trainingName": "Empty", "category": "Cardio", "trainingPlan": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["message"], "Please provide all required fields.");
}

#[tokio::test]
async fn test_list_own_plans_then_cache() {
    let harness = TestHarness::new().await;
    create_plan(&harness, USER_TOKEN, "A", false).await;
    create_plan(&harness, USER_TOKEN, "B", false).await;
    create_plan(&harness, OTHER_TOKEN, "C", false).await;

    let first: Value = harness.get(PATH, USER_TOKEN).await.json();
    assert_eq!(first["message"], "Training data retrieved successfully");
    assert_eq!(first["totalData"], 2);

    let second: Value = harness.get(PATH, USER_TOKEN).await.json();
    assert_eq!(second["message"], "Training retrieved from cache successfully");
    assert_eq!(second["trainingData"], first["trainingData"]);
}

#[tokio::test]
async fn test_empty_list() {
    let harness = TestHarness::new().await;

    let response = harness.get(PATH, USER_TOKEN).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["message"], "No training found for this user");
}

#[tokio::test]
async fn test_non_owner_cannot_delete_private_plan() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");

    let response = harness.delete(&format!("{}/{}", PATH, id), OTHER_TOKEN).await;

    response.assert_status(StatusCode::FORBIDDEN);
    let json: Value = response.json();
    assert_eq!(json["message"], "You are not authorized to delete this training.");

    let listing: Value = harness.get(PATH, USER_TOKEN).await.json();
    assert_eq!(listing["totalData"], 1);
}

#[tokio::test]
async fn test_owner_deletes_private_plan() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");

    let response = harness.delete(&format!("{}/{}", PATH, id), USER_TOKEN).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["message"], "Training deleted successfully");
}

#[tokio::test]
async fn test_delete_unknown_plan() {
    let harness = TestHarness::new().await;

    let response = harness
        .delete(&format!("{}/missing", PATH), USER_TOKEN)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["message"], "Training not found");
}

#[tokio::test]
async fn test_non_admin_cannot_change_visibility() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");

    let response = harness
        .patch(&format!("{}/{}", PATH, id), USER_TOKEN)
        .json(&json!({ "isPublic": true }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let json: Value = response.json();
    assert_eq!(json["message"], "Only admins can update public training data.");
}

#[tokio::test]
async fn test_visibility_update_requires_flag() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");

    let response = harness
        .patch(&format!("{}/{}", PATH, id), ADMIN_TOKEN)
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["message"], "All field is required to update");
}

#[tokio::test]
async fn test_admin_publishes_plan_and_public_listing_paginates() {
    let harness = TestHarness::new().await;
    for i in 0..3 {
        create_plan(&harness, ADMIN_TOKEN, &format!("Public {}", i), true).await;
    }
    create_plan(&harness, USER_TOKEN, "Private", false).await;
    public_plan_of_user(&harness).await;

    let response = harness
        .get(&format!("{}/public", PATH), OTHER_TOKEN)
        .add_query_param("limit", "3")
        .add_query_param("page", "2")
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["message"], "All public training data retrieved successfully");
    assert_eq!(json["total"], 4);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["currentPage"], 2);
    assert_eq!(json["trainingData"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_public_listing_defaults_to_ten_per_page() {
    let harness = TestHarness::new().await;
    for i in 0..11 {
        create_plan(&harness, ADMIN_TOKEN, &format!("Public {}", i), true).await;
    }

    let json: Value = harness
        .get(&format!("{}/public", PATH), USER_TOKEN)
        .await
        .json();

    assert_eq!(json["total"], 11);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["trainingData"].as_array().map(Vec::len), Some(10));
}

#[tokio::test]
async fn test_non_admin_cannot_delete_public_plan() {
    let harness = TestHarness::new().await;
    let id = public_plan_of_user(&harness).await;

    // Not even the owner, once the plan is public
    let response = harness.delete(&format!("{}/{}", PATH, id), USER_TOKEN).await;

    response.assert_status(StatusCode::FORBIDDEN);
    let json: Value = response.json();
    assert_eq!(json["message"], "Only admins can delete public training data.");
}

#[tokio::test]
async fn test_admin_delete_invalidates_owner_cache() {
    let harness = TestHarness::new().await;
    let id = public_plan_of_user(&harness).await;
    harness.get(PATH, USER_TOKEN).await.assert_status_ok();
    assert!(cached(&harness, USER_ID).await);

    harness
        .delete(&format!("{}/{}", PATH, id), ADMIN_TOKEN)
        .await
        .assert_status_ok();

    assert!(!cached(&harness, USER_ID).await);
    harness
        .get(PATH, USER_TOKEN)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_appends_entries() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");
    harness.get(PATH, USER_TOKEN).await.assert_status_ok();

    let response = harness
        .put(&format!("{}/{}", PATH, id), USER_TOKEN)
        .json(&json!({ "trainingPlan": [{ "exercise": "deadlift", "sets": 3, "reps": 5 }] }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let entries = json["training"]["trainingPlan"]
        .as_array()
        .expect("trainingPlan array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["exercise"], "deadlift");
    assert!(!cached(&harness, USER_ID).await);
}

#[tokio::test]
async fn test_non_owner_cannot_append() {
    let harness = TestHarness::new().await;
    let created = create_plan(&harness, USER_TOKEN, "Mine", false).await;
    let id = id_of(&created, "training");

    let response = harness
        .put(&format!("{}/{}", PATH, id), OTHER_TOKEN)
        .json(&json!({ "trainingPlan": [{ "exercise": "row" }] }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let json: Value = response.json();
    assert_eq!(json["message"], "You are not authorized to update this training.");
}
