//! Network clients (§4.2): a uniform capability over a lightweight HTTP
//! client and a browser-driven client, so providers don't need to know
//! which transport a given site requires.

mod browser_client;
mod http_client;

pub use browser_client::BrowserNetworkClient;
pub use http_client::HttpNetworkClient;

use async_trait::async_trait;
use chromiumoxide::page::Page;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// A single capability shared by both transports (§4.2).
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_html(&self, url: &str, ct: &CancellationToken) -> Result<String, ProviderError>;

    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        ct: &CancellationToken,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Returns `None` for clients that can't drive a live page (the HTTP client).
    async fn open_browser_page(&self, url: &str, ct: &CancellationToken) -> Result<Option<Page>, ProviderError>;
}
