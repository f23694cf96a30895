//! Integration tests for mvv-agg API endpoints
//!
//! These tests exercise routing and handler logic without network access:
//! blank city names are rejected by the resolver before any outbound call,
//! so the not-found paths are fully testable offline.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use mvv_common::AppConfig;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

use mvv_agg::{build_router, AppState};

/// Test helper: Create app with default (unreached) upstream configuration
fn setup_app() -> axum::Router {
    let state = AppState::new(&AppConfig::default()).expect("Client init should succeed");
    build_router(state)
}

/// Test helper: Create request
fn test_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app();

    let response = app.oneshot(test_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mvv-agg");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_metrics_blank_city_is_not_found() {
    let app = setup_app();

    // A whitespace-only city never reaches the network
    let response = app.oneshot(test_request("/api/metrics/%20%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_compare_requires_both_cities() {
    let app = setup_app();

    // Missing query parameters are rejected by extraction
    let response = app.oneshot(test_request("/api/compare")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_both_blank_is_not_found() {
    let app = setup_app();

    let response = app
        .oneshot(test_request("/api/compare?city_a=%20&city_b=%20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_events_blank_city_is_not_found() {
    let app = setup_app();

    let response = app.oneshot(test_request("/api/events/%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = setup_app();

    let response = app.oneshot(test_request("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
