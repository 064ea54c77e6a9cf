//! Integration Tests for API Endpoints
//!
//! Drives the router end to end against in-memory tables.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use portal_store::{create_router, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, AppState) {
    let state = AppState::in_memory(Config::default());
    (create_router(state.clone()), state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// == Table Endpoint Tests ==

#[tokio::test]
async fn test_groups_end_to_end() {
    let (app, _) = create_test_app();

    let (status, created) = send(
        &app,
        "POST",
        "/tables/groups",
        Some(json!({"name": "Juniors", "trainer_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert!(created["created_at"].is_string());

    let (status, listed) = send(&app, "GET", "/tables/groups?page=1&limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["name"], "Juniors");

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/tables/groups/{}", id),
        Some(json!({"name": "U12", "id": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "U12");
    assert!(updated["updated_at"].is_string());

    // The cached page from before the update must not be served again
    let (_, listed) = send(&app, "GET", "/tables/groups?page=1&limit=10", None).await;
    assert_eq!(listed["data"][0]["name"], "U12");

    let (status, _) = send(&app, "DELETE", &format!("/tables/groups/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/tables/groups/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, listed) = send(&app, "GET", "/tables/groups", None).await;
    assert_eq!(listed["pagination"]["total"], 0);
    assert_eq!(listed["pagination"]["pages"], 0);
}

#[tokio::test]
async fn test_bulk_create_and_filtered_pages() {
    let (app, _) = create_test_app();
    let rows: Vec<Value> = (0..7)
        .map(|i| json!({"name": format!("g{}", i), "trainer_id": i % 2}))
        .collect();

    let (status, created) = send(&app, "POST", "/tables/groups", Some(Value::Array(rows))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.as_array().unwrap().len(), 7);

    let (_, page) = send(&app, "GET", "/tables/groups?trainer_id=1&limit=2&page=2", None).await;
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["pages"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0]["name"], "g5");
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let (app, _) = create_test_app();

    let (status, page) = send(&app, "GET", "/tables/groups?limit=5000", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["limit"], 100);
}

#[tokio::test]
async fn test_last_possible_page_is_empty() {
    let (app, _) = create_test_app();
    send(&app, "POST", "/tables/groups", Some(json!({"name": "Juniors"}))).await;

    let (status, page) = send(&app, "GET", "/tables/groups?page=18446744073709551615", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert!(page["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_filter_value_with_separators_is_not_confused() {
    let (app, _) = create_test_app();
    send(&app, "POST", "/tables/groups", Some(json!({"name": "1&trainer_id=2"}))).await;

    let (_, packed) = send(&app, "GET", "/tables/groups?name=1%26trainer_id%3D2", None).await;
    assert_eq!(packed["pagination"]["total"], 1);

    let (_, split) = send(&app, "GET", "/tables/groups?name=1&trainer_id=2", None).await;
    assert_eq!(split["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_bad_requests() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "GET", "/tables/groups?page=zero", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("page"));

    let (status, _) = send(&app, "POST", "/tables/groups", Some(json!("Juniors"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/tables/users", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_row_is_not_found() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "PATCH", "/tables/groups/77", Some(json!({"name": "x"}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("groups"));
}

// == Session Endpoint Tests ==

#[tokio::test]
async fn test_session_details_and_cancel() {
    let (app, _) = create_test_app();
    send(&app, "POST", "/tables/groups", Some(json!({"name": "Juniors"}))).await;
    let (_, session) = send(
        &app,
        "POST",
        "/tables/sessions",
        Some(json!({"group_id": 1, "starts_at": "2025-03-04T18:30:00Z", "status": "scheduled"})),
    )
    .await;
    let session_id = session["id"].as_i64().unwrap();
    send(
        &app,
        "POST",
        "/tables/attendance",
        Some(json!([
            {"session_id": session_id, "member_id": 10, "status": "present"},
            {"session_id": session_id, "member_id": 11, "status": "late"}
        ])),
    )
    .await;

    let (status, details) = send(&app, "GET", &format!("/sessions/{}/details", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["attendance"].as_array().unwrap().len(), 2);

    let (status, cancelled) = send(&app, "POST", &format!("/sessions/{}/cancel", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, details) = send(&app, "GET", &format!("/sessions/{}/details", session_id), None).await;
    assert_eq!(details["session"]["status"], "cancelled");
    assert!(details["attendance"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/sessions/999/details", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let (app, _) = create_test_app();

    send(&app, "GET", "/tables/groups", None).await;
    send(&app, "GET", "/tables/groups", None).await;
    let (status, stats) = send(&app, "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 1);
    assert!(stats["misses"].as_u64().unwrap() >= 1);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn test_cache_prefix_and_clear() {
    let (app, state) = create_test_app();
    send(&app, "GET", "/tables/groups", None).await;
    send(&app, "GET", "/tables/sessions", None).await;
    assert_eq!(state.cache.len().await, 2);

    let (status, body) = send(&app, "DELETE", "/cache/groups:list:", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);
    assert!(!state.cache.has("groups:list:page=1:limit=20:{}").await);

    let (_, body) = send(&app, "DELETE", "/cache", None).await;
    assert_eq!(body["removed"], 1);
    assert!(state.cache.is_empty().await);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
}
