//! The pooled HTTP client (§4.2): keep-alive, automatic decompression, no
//! cookie jar, a fixed 30s per-request timeout and browser-like default
//! headers.

use async_trait::async_trait;
use chromiumoxide::page::Page;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{NetworkClient, DEFAULT_USER_AGENT};
use crate::error::ProviderError;

pub struct HttpNetworkClient {
    client: reqwest::Client,
}

impl HttpNetworkClient {
    pub fn new() -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .cookie_store(false)
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self { client })
    }

    async fn run<F>(&self, ct: &CancellationToken, fut: F) -> Result<reqwest::Response, ProviderError>
    where
        F: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        tokio::select! {
            _ = ct.cancelled() => Err(ProviderError::Cancelled),
            result = fut => result.map_err(ProviderError::Network),
        }
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn get_html(&self, url: &str, ct: &CancellationToken) -> Result<String, ProviderError> {
        let response = self.run(ct, self.client.get(url).send()).await?;
        response.text().await.map_err(ProviderError::Network)
    }

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        ct: &CancellationToken,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProviderError::Parse(format!("invalid header name {name}: {e}")))?;
            request = request.header(header_name, *value);
        }
        let response = self.run(ct, request.send()).await?;
        response.json().await.map_err(ProviderError::Network)
    }

    async fn open_browser_page(&self, _url: &str, _ct: &CancellationToken) -> Result<Option<Page>, ProviderError> {
        Ok(None)
    }
}
