//! Shared stub provider and app-wiring helpers for the end-to-end scenario
//! tests. Kept under `tests/support/` rather than `tests/common/` so it
//! reads as test infrastructure, not a test case, the way the teacher keeps
//! its own multi-file `tests/` helpers out of the top-level test list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use mediascrape_gateway::cache::MetadataCache;
use mediascrape_gateway::config::{GatewayConfigBuilder, ProviderConfig};
use mediascrape_gateway::error::ProviderError;
use mediascrape_gateway::limiter::ConcurrencyLimiter;
use mediascrape_gateway::model::{Metadata, SearchHit};
use mediascrape_gateway::orchestrator::{Orchestrator, ProviderPipeline};
use mediascrape_gateway::provider::Provider;
use mediascrape_gateway::rate_limiter::SlotRateLimiter;
use mediascrape_gateway::server::{build_router, AppState};

/// A provider that never touches the network: `search` fabricates hits from
/// the keyword verbatim, `fetch_detail` counts calls, tracks the peak
/// number of concurrently in-flight calls, and can be told to stall so
/// tests can observe coalescing and fan-out bounds.
pub struct StubProvider {
    name: String,
    search_hits: usize,
    detail_delay: Duration,
    detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubProvider {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            search_hits: 0,
            detail_delay: Duration::ZERO,
            detail_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_search_hits(mut self, n: usize) -> Self {
        self.search_hits = n;
        self
    }

    #[must_use]
    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    pub fn detail_call_count(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn max_observed_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_parse_id(&self, input: &str) -> Option<String> {
        let looks_like_id = !input.is_empty()
            && input.chars().all(|c| c.is_ascii_alphanumeric())
            && input.chars().any(|c| c.is_ascii_digit());
        looks_like_id.then(|| input.to_string())
    }

    fn build_detail_url(&self, id: &str) -> String {
        format!("https://stub.test/{}/{id}", self.name)
    }

    async fn search(
        &self,
        keyword: &str,
        max_results: usize,
        _ct: &CancellationToken,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let n = self.search_hits.min(max_results);
        Ok((0..n)
            .map(|i| SearchHit {
                detail_url: format!("https://stub.test/{}/{keyword}-{i}", self.name),
                title: format!("{keyword}-{i}"),
                cover_url: None,
            })
            .collect())
    }

    async fn fetch_detail(
        &self,
        detail_url: &str,
        ct: &CancellationToken,
    ) -> Result<Option<Metadata>, ProviderError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let wait_result = if self.detail_delay.is_zero() {
            Ok(())
        } else {
            tokio::select! {
                _ = ct.cancelled() => Err(ProviderError::Cancelled),
                () = tokio::time::sleep(self.detail_delay) => Ok(()),
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        wait_result?;

        let id = detail_url.rsplit('/').next().unwrap_or_default().to_string();
        let mut metadata = Metadata {
            id,
            title: Some(format!("{} detail", self.name)),
            ..Default::default()
        };
        metadata.record_source_url(detail_url);
        metadata.normalize();
        Ok(Some(metadata))
    }
}

/// Builds a fully wired router around a single stub provider registered
/// under `name`, with its own cache and the given concurrency/rate limits.
#[must_use]
pub fn build_test_app(name: &str, provider: Arc<StubProvider>, max_concurrent: usize, rate_limit_seconds: f64) -> Router {
    let mut pipelines: HashMap<String, ProviderPipeline> = HashMap::new();
    pipelines.insert(
        name.to_string(),
        ProviderPipeline {
            provider,
            limiter: ConcurrencyLimiter::new(max_concurrent),
            rate_limiter: SlotRateLimiter::new(Duration::from_secs_f64(rate_limit_seconds)),
        },
    );

    let cache = Arc::new(MetadataCache::new(1_000, Duration::from_secs(3600)));
    let orchestrator = Orchestrator::new(pipelines, cache);

    let config = GatewayConfigBuilder::new()
        .provider(name, ProviderConfig::new(name, "https://stub.test", max_concurrent, rate_limit_seconds))
        .request_timeout_seconds(60)
        .build();

    build_router(Arc::new(AppState { orchestrator, config }))
}
