//! S3: concurrent requests for the same cold id collapse onto a single
//! upstream fetch via the double-checked cache.
//!
//! Uses a single concurrency slot so the coalescing barrier is the only
//! thing standing between ten simultaneous callers and ten upstream
//! fetches: with one slot, nine of the ten necessarily queue behind the
//! first and find the id already cached by the time they're let through.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use support::{build_test_app, StubProvider};

#[tokio::test]
async fn concurrent_requests_for_one_id_coalesce_to_a_single_fetch() {
    let stub = Arc::new(StubProvider::new("dlsite").with_detail_delay(Duration::from_millis(80)));
    let app = build_test_app("dlsite", Arc::clone(&stub), 1, 0.0);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .uri("/api/dlsite/RJ000001")
                .body(Body::empty())
                .unwrap();
            app.oneshot(request).await.unwrap().status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(stub.detail_call_count(), 1, "all ten callers should have coalesced onto one upstream fetch");
}
