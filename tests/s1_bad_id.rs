//! S1: a malformed id is rejected before it ever reaches a provider.

mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use support::{build_test_app, StubProvider};

#[tokio::test]
async fn bad_id_returns_400_with_a_failed_envelope() {
    let stub = Arc::new(StubProvider::new("dlsite"));
    let app = build_test_app("dlsite", Arc::clone(&stub), 2, 0.0);

    let request = Request::builder()
        .uri("/api/dlsite/notanid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], Value::Bool(false));
    let error = body["error"].as_str().unwrap().to_lowercase();
    assert!(error.contains("invalid"), "expected an 'invalid id' error, got: {error}");

    assert_eq!(stub.detail_call_count(), 0, "a malformed id must never reach the provider");
}
