//! S2: a digit-shaped search title is passed through to `search` as a
//! keyword, never reinterpreted as an id.

mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use support::{build_test_app, StubProvider};

#[tokio::test]
async fn numeric_title_is_treated_as_a_keyword_not_an_id() {
    let stub = Arc::new(StubProvider::new("hanime").with_search_hits(3));
    let app = build_test_app("hanime", Arc::clone(&stub), 2, 0.0);

    let request = Request::builder()
        .uri("/api/hanime/search?title=123456&max=1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], Value::Bool(true));

    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1, "max=1 must cap enrichment to a single result");

    // The enriched id is derived from the hit's detail URL, which the stub
    // built directly from the keyword — so it surviving into the final
    // record proves "123456" rode through as a keyword, not a parsed id.
    let id = results[0]["id"].as_str().unwrap();
    assert_eq!(id, "123456-0", "keyword must survive verbatim into the enriched result, got: {id}");
}
