//! Exercises `HttpNetworkClient` against a mocked HTTP server instead of a
//! live site, grounded on the teacher's own mockito-based request fixtures
//! (`tests/common/mod.rs`'s `setup_mock_server`/`create_html_mock`).

use tokio_util::sync::CancellationToken;

use mediascrape_gateway::error::ProviderError;
use mediascrape_gateway::network::{HttpNetworkClient, NetworkClient};

#[tokio::test]
async fn get_html_returns_the_mocked_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/work/=/product_id/RJ123456.html")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body><h1 class=\"work_name\">Sample</h1></body></html>")
        .create_async()
        .await;

    let client = HttpNetworkClient::new().unwrap();
    let ct = CancellationToken::new();
    let url = format!("{}/work/=/product_id/RJ123456.html", server.url());
    let html = client.get_html(&url, &ct).await.unwrap();

    assert!(html.contains("Sample"));
}

#[tokio::test]
async fn get_json_parses_the_mocked_body_and_forwards_custom_headers() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/search")
        .match_header("x-api-key", "demo-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hits": [{"id": 1, "name": "demo"}]}"#)
        .create_async()
        .await;

    let client = HttpNetworkClient::new().unwrap();
    let ct = CancellationToken::new();
    let url = format!("{}/api/v1/search", server.url());
    let value = client.get_json(&url, &[("x-api-key", "demo-key")], &ct).await.unwrap();

    assert_eq!(value["hits"][0]["name"], "demo");
}

#[tokio::test]
async fn get_html_is_cancelled_immediately_if_the_token_is_already_cancelled() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;

    let client = HttpNetworkClient::new().unwrap();
    let ct = CancellationToken::new();
    ct.cancel();
    let url = format!("{}/slow", server.url());

    let result = client.get_html(&url, &ct).await;
    assert!(matches!(result, Err(ProviderError::Cancelled)), "expected Cancelled, got {result:?}");
}
