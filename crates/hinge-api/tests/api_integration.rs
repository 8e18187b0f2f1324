//! Integration tests for the hinge REST API.
//!
//! Run with: `cargo test --package hinge-api --test api_integration`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use hinge_api::{create_api_router, create_api_state};
use hinge_engine::{EngineConfig, MemoryCampaignStore, TurnOrchestrator};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Create a test router over an in-memory store.
fn create_test_router() -> Router {
    let orchestrator = TurnOrchestrator::new(Arc::new(MemoryCampaignStore::new()), EngineConfig::default());
    create_api_router(create_api_state(orchestrator))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!(null));

    (status, json)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body)).await
}

/// Router with the sample campaign created as `wren`.
async fn router_with_campaign() -> Router {
    let router = create_test_router();
    let (status, _) = post(&router, "/campaigns", json!({ "id": "wren" })).await;
    assert_eq!(status, StatusCode::CREATED);
    router
}

fn risky_travel(action_id: &str, version: u64) -> Value {
    json!({
        "action_id": action_id,
        "state_version": version,
        "payload": { "type": "travel", "destination": "market", "approach": { "type": "risky_traversal" } }
    })
}

// =============================================================================
// Health & campaigns
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = router_with_campaign().await;
    let (status, body) = get(&router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["campaigns"], 1);
    assert!(body["timestamp"].is_u64());
}

#[tokio::test]
async fn test_create_and_list_campaigns() {
    let router = router_with_campaign().await;

    let (status, body) = get(&router, "/campaigns").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["wren"]));

    let (status, body) = get(&router, "/campaigns/wren").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state_version"], 0);
    assert_eq!(body["data"]["player"]["current_region"], "docks");
}

#[tokio::test]
async fn test_create_existing_campaign_conflicts() {
    let router = router_with_campaign().await;
    let (status, _) = post(&router, "/campaigns", json!({ "id": "wren" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_campaign_is_not_found() {
    let router = create_test_router();
    let (status, body) = get(&router, "/campaigns/nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_campaign() {
    let router = router_with_campaign().await;
    let (status, _) = send(&router, Method::DELETE, "/campaigns/wren", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&router, "/campaigns/wren").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Turns
// =============================================================================

#[tokio::test]
async fn test_proposal_reports_blocked_route() {
    let router = router_with_campaign().await;
    let (status, body) = post(
        &router,
        "/campaigns/wren/proposals",
        json!({ "payload": { "type": "travel", "destination": "market" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["traversable"], false);
    assert!(!body["data"]["alternatives"].as_array().unwrap().is_empty());

    let (_, view) = get(&router, "/campaigns/wren").await;
    assert_eq!(view["data"]["state_version"], 0);
}

#[tokio::test]
async fn test_submit_commits_and_replays_duplicates() {
    let router = router_with_campaign().await;

    let (status, first) = post(&router, "/campaigns/wren/actions", risky_travel("go", 0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["new_state_version"], 1);
    assert_eq!(first["data"]["state_snapshot"]["player"]["current_region"], "market");

    let (status, second) = post(&router, "/campaigns/wren/actions", risky_travel("go", 0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn test_stale_submission_conflicts() {
    let router = router_with_campaign().await;
    post(&router, "/campaigns/wren/actions", risky_travel("first", 0)).await;

    let (status, body) = post(&router, "/campaigns/wren/actions", risky_travel("second", 0)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["code"], "STALE_STATE");
}

#[tokio::test]
async fn test_unmet_requirements_are_unprocessable() {
    let router = router_with_campaign().await;
    let (status, body) = post(
        &router,
        "/campaigns/wren/actions",
        json!({
            "action_id": "walk",
            "state_version": 0,
            "payload": { "type": "travel", "destination": "market" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["code"], "REQUIREMENT_NOT_MET");
    assert!(!body["data"]["failed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_hinges_endpoint_lists_committed_choices() {
    let router = router_with_campaign().await;
    let (status, _) = post(
        &router,
        "/campaigns/wren/actions",
        json!({
            "action_id": "oath",
            "state_version": 0,
            "payload": {
                "type": "commit_choice",
                "situation": "Marrow asks you to stay",
                "choice": "you stay",
                "reasoning": "the docks are home"
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/campaigns/wren/hinges").await;
    assert_eq!(status, StatusCode::OK);
    let hinges = body["data"].as_array().unwrap();
    assert_eq!(hinges.len(), 1);
    assert_eq!(hinges[0]["choice"], "you stay");
}
