//! A metadata-scraping gateway that fronts adult-content provider sites
//! behind a uniform HTTP/JSON API for media-server plugins.
//!
//! The crate is organized leaf-first, the way the teacher repo lays out
//! `crawl_engine`/`config`/`mcp`: data model and pure logic at the bottom
//! (`model`, `cache`, `limiter`, `rate_limiter`), network and browser
//! plumbing in the middle (`network`, `browser_pool`), provider
//! implementations on top of those (`provider`), and the request
//! orchestrator plus HTTP shell wiring everything together
//! (`orchestrator`, `server`).

pub mod browser_pool;
pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod model;
pub mod network;
pub mod orchestrator;
pub mod provider;
pub mod rate_limiter;
pub mod server;

use std::collections::HashMap;
use std::sync::Arc;

use browser_pool::{BrowserContextPool, Role};
use cache::MetadataCache;
use config::GatewayConfig;
use network::{BrowserNetworkClient, HttpNetworkClient, NetworkClient};
use orchestrator::{Orchestrator, ProviderPipeline};
use provider::{DlsiteLikeProvider, HanimeLikeProvider, Provider};
use rate_limiter::SlotRateLimiter;
use server::AppState;

/// Builds the full set of provider pipelines and the shared cache from a
/// [`GatewayConfig`], wiring each registered provider to a browser-backed
/// network client so anti-bot navigation goes through the context pool
/// (§4.2) while plain JSON traffic still rides the pooled HTTP client.
///
/// Returns the `AppState` the service shell (`server::build_router`) needs.
/// The returned `Arc<BrowserContextPool>` is exposed separately so the
/// caller can shut it down on exit (`BrowserContextPool` has no implicit
/// background task of its own to await, but the browsers it launches do).
pub fn build_app_state(config: GatewayConfig) -> anyhow::Result<(Arc<AppState>, Arc<BrowserContextPool>)> {
    let browser_pool = Arc::new(BrowserContextPool::new(config.browser_pool().clone()));

    let mut pipelines: HashMap<String, ProviderPipeline> = HashMap::new();

    for name in config.provider_names().map(str::to_string).collect::<Vec<_>>() {
        let provider_config = config
            .provider(&name)
            .expect("name came from provider_names(), so provider(name) is Some");

        let search_client: Arc<dyn NetworkClient> = Arc::new(BrowserNetworkClient::new(
            Arc::clone(&browser_pool),
            Role::Search,
            Arc::new(HttpNetworkClient::new()?),
        ));
        let detail_client: Arc<dyn NetworkClient> = Arc::new(BrowserNetworkClient::new(
            Arc::clone(&browser_pool),
            Role::Detail,
            Arc::new(HttpNetworkClient::new()?),
        ));

        let provider: Arc<dyn Provider> = match name.as_str() {
            "dlsite" => Arc::new(DlsiteLikeProvider::with_clients(
                provider_config.base_url(),
                search_client,
                detail_client,
            )),
            "hanime" => Arc::new(HanimeLikeProvider::with_clients(
                provider_config.base_url(),
                search_client,
                detail_client,
            )),
            other => {
                tracing::warn!(event = "ServiceStartup", provider = other, "no provider implementation registered for this name, skipping");
                continue;
            }
        };
        pipelines.insert(
            name.clone(),
            ProviderPipeline {
                provider,
                limiter: limiter::ConcurrencyLimiter::new(provider_config.max_concurrent_requests()),
                rate_limiter: SlotRateLimiter::new(provider_config.min_interval()),
            },
        );
    }

    let cache = Arc::new(MetadataCache::new(config.cache().capacity(), config.cache().ttl()));
    let orchestrator = Orchestrator::new(pipelines, cache);

    Ok((Arc::new(AppState { orchestrator, config }), browser_pool))
}
