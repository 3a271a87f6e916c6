//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use overlay_server::{MemoryOverlayStore, OverlayService, build_router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

/// Create a test application router backed by a fresh in-memory store
pub fn create_test_app_with_store() -> (Router, Arc<MemoryOverlayStore>) {
    let store = Arc::new(MemoryOverlayStore::new());
    let service = OverlayService::new(store.clone());
    let app = build_router(service, Duration::from_secs(5));
    (app, store)
}

/// Create a test application router with all routes configured
pub fn create_test_app() -> Router {
    create_test_app_with_store().0
}

/// Standard text overlay body
pub fn text_overlay_body() -> Value {
    serde_json::json!({
        "type": "text",
        "content": {"text": "Hi"},
        "position": {"x": 0, "y": 0},
        "size": {"w": 100, "h": 50}
    })
}

/// Send a request with an optional JSON body and decode the JSON response
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

/// Send a prebuilt request and decode the JSON response
pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

/// Create an overlay through the API and return the response body
pub async fn create_overlay(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, "POST", "/api/overlays", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected create response: {json}");
    json
}
