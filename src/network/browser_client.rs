//! The browser-driven client (§4.2): used for JS-heavy / challenge-protected
//! navigation. JSON traffic is delegated to the pooled HTTP client — browser
//! contexts are scarce and must not be spent on endpoints that don't need
//! rendering.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::page::Page;
use tokio_util::sync::CancellationToken;

use super::{HttpNetworkClient, NetworkClient};
use crate::browser_pool::{BrowserContextPool, Role};
use crate::error::ProviderError;

pub struct BrowserNetworkClient {
    pool: Arc<BrowserContextPool>,
    role: Role,
    http_fallback: Arc<HttpNetworkClient>,
}

impl BrowserNetworkClient {
    #[must_use]
    pub fn new(pool: Arc<BrowserContextPool>, role: Role, http_fallback: Arc<HttpNetworkClient>) -> Self {
        Self {
            pool,
            role,
            http_fallback,
        }
    }
}

#[async_trait]
impl NetworkClient for BrowserNetworkClient {
    async fn get_html(&self, url: &str, ct: &CancellationToken) -> Result<String, ProviderError> {
        self.pool.get_html(self.role, url, ct).await
    }

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        ct: &CancellationToken,
    ) -> Result<serde_json::Value, ProviderError> {
        self.http_fallback.get_json(url, headers, ct).await
    }

    async fn open_browser_page(&self, url: &str, ct: &CancellationToken) -> Result<Option<Page>, ProviderError> {
        let _ = ct;
        self.pool.open_page(self.role, url).await.map(Some)
    }
}
