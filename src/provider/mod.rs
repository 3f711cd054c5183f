//! The `Provider` capability (§4.1): per-site ID parsing, URL building,
//! search, and detail fetch, modeled as a black box over a [`NetworkClient`].

mod dlsite_like;
mod hanime_like;

pub use dlsite_like::DlsiteLikeProvider;
pub use hanime_like::HanimeLikeProvider;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::model::{Metadata, SearchHit};

#[async_trait]
pub trait Provider: Send + Sync {
    /// The route prefix this provider answers under, e.g. `"dlsite"`.
    fn name(&self) -> &str;

    /// Parses a raw input (URL, bare id, filename) into this provider's
    /// canonical id. Returns `None` rather than erroring on anything that
    /// doesn't look like this provider's id grammar.
    fn try_parse_id(&self, input: &str) -> Option<String>;

    /// Pure function from canonical id to the preferred detail URL.
    fn build_detail_url(&self, id: &str) -> String;

    /// Up to `max_results` deduplicated hits, in relevance order. An empty
    /// vec on no matches is not an error.
    async fn search(
        &self,
        keyword: &str,
        max_results: usize,
        ct: &CancellationToken,
    ) -> Result<Vec<SearchHit>, ProviderError>;

    /// `None` when `detail_url` demonstrably doesn't address a product.
    /// Always records `detail_url` in the returned record's `source_urls`.
    async fn fetch_detail(
        &self,
        detail_url: &str,
        ct: &CancellationToken,
    ) -> Result<Option<Metadata>, ProviderError>;
}
