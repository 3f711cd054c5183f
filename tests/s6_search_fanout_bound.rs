//! S6: a search returning many hits never drives more than 4 concurrent
//! detail fetches, regardless of how many concurrency slots the provider
//! has configured.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use support::{build_test_app, StubProvider};

#[tokio::test]
async fn search_enrichment_never_exceeds_the_fixed_fanout_degree() {
    let stub = Arc::new(
        StubProvider::new("hanime")
            .with_search_hits(20)
            .with_detail_delay(Duration::from_millis(30)),
    );
    // Eight slots is deliberately more generous than the fan-out degree, to
    // prove the degree-4 ceiling is a property of the fan-out combinator,
    // not an incidental effect of a small provider slot count.
    let app = build_test_app("hanime", Arc::clone(&stub), 8, 0.0);

    let request = Request::builder()
        .uri("/api/hanime/search?title=demo&max=20")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.detail_call_count(), 20);
    assert!(
        stub.max_observed_in_flight() <= 4,
        "fan-out must never exceed 4 concurrent fetches, observed {}",
        stub.max_observed_in_flight()
    );
    assert_eq!(
        stub.max_observed_in_flight(),
        4,
        "with 20 hits and a 30ms per-fetch delay, the fan-out should actually reach the degree-4 ceiling"
    );
}
