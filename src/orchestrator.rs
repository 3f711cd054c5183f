//! Request orchestrator (§4.7): sequences cache, limiter, rate limiter, and
//! provider calls for the three public operations the service shell exposes.
//!
//! Grounded on the teacher's `crawl_engine::orchestrator` for its bounded-
//! parallel fan-out style (`FuturesUnordered` + spawned tasks) and
//! event-tagged logging, reshaped around §4.7's fixed three-step pipeline
//! instead of a BFS crawl queue.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::cache::MetadataCache;
use crate::error::{GatewayError, ProviderError};
use crate::limiter::ConcurrencyLimiter;
use crate::model::{Metadata, SearchHit};
use crate::provider::Provider;
use crate::rate_limiter::SlotRateLimiter;

/// Bounded-parallel fan-out degree for search enrichment (§4.7.2), fixed
/// regardless of a provider's `maxConcurrentRequests`.
const SEARCH_FANOUT_DEGREE: usize = 4;

/// Bounded wait for a concurrency slot before returning 429 (§4.7.1 step 3).
const SLOT_WAIT_BUDGET: Duration = Duration::from_secs(15);

pub struct ProviderPipeline {
    pub provider: Arc<dyn Provider>,
    pub limiter: ConcurrencyLimiter,
    pub rate_limiter: SlotRateLimiter,
}

pub struct Orchestrator {
    pipelines: std::collections::HashMap<String, ProviderPipeline>,
    cache: Arc<MetadataCache>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(pipelines: std::collections::HashMap<String, ProviderPipeline>, cache: Arc<MetadataCache>) -> Self {
        Self { pipelines, cache }
    }

    fn pipeline(&self, provider_name: &str) -> Result<&ProviderPipeline, GatewayError> {
        self.pipelines
            .get(provider_name)
            .ok_or_else(|| GatewayError::UnknownProvider(provider_name.to_string()))
    }

    /// §4.7.1: detail-by-id.
    pub async fn detail_by_id(
        &self,
        provider_name: &str,
        input: &str,
        ct: &CancellationToken,
    ) -> Result<Metadata, GatewayError> {
        let pipeline = self.pipeline(provider_name)?;

        let id = pipeline
            .provider
            .try_parse_id(input)
            .ok_or_else(|| GatewayError::InvalidInput(format!("Invalid id for provider {provider_name}: {input}")))?;

        if let Some(hit) = self.cache.try_get(provider_name, &id) {
            tracing::debug!(event = "ProviderDetail", provider = provider_name, id, "cache-hit-fast-path");
            return Ok(hit);
        }
        if self.cache.contains_fresh(provider_name, &id) {
            return Err(GatewayError::NotFound);
        }

        let slot = pipeline
            .limiter
            .try_acquire(SLOT_WAIT_BUDGET, ct)
            .await
            .map_err(|_| GatewayError::Cancelled)?
            .ok_or(GatewayError::Busy)?;

        // Coalescing barrier: a peer that finished scraping while we waited
        // for a slot will have already populated the cache.
        if let Some(hit) = self.cache.try_get(provider_name, &id) {
            slot.release();
            return Ok(hit);
        }
        if self.cache.contains_fresh(provider_name, &id) {
            slot.release();
            return Err(GatewayError::NotFound);
        }

        pipeline
            .rate_limiter
            .wait_if_needed(slot.id(), ct)
            .await
            .map_err(|_| GatewayError::Cancelled)?;

        let detail_url = pipeline.provider.build_detail_url(&id);
        let result = pipeline.provider.fetch_detail(&detail_url, ct).await;

        let outcome = match result {
            Ok(Some(metadata)) => {
                pipeline.rate_limiter.record_complete(slot.id());
                self.cache.put(provider_name, &id, Some(metadata.clone()));
                tracing::info!(event = "ProviderDetail", provider = provider_name, id, "fetched");
                Ok(metadata)
            }
            Ok(None) => {
                pipeline.rate_limiter.record_complete(slot.id());
                self.cache.put(provider_name, &id, None);
                Err(GatewayError::NotFound)
            }
            Err(ProviderError::Cancelled) => Err(GatewayError::Cancelled),
            Err(e) => {
                tracing::warn!(event = "ProviderDetail", provider = provider_name, id, error = %e, "upstream error, not recorded");
                Err(GatewayError::UpstreamTransient(e))
            }
        };

        slot.release();
        outcome
    }

    /// §4.7.2: search, with bounded-parallel detail enrichment.
    pub async fn search(
        &self,
        provider_name: &str,
        title: &str,
        max_results: usize,
        ct: &CancellationToken,
    ) -> Result<Vec<Metadata>, GatewayError> {
        let pipeline = self.pipeline(provider_name)?;
        let max_results = max_results.clamp(1, 50);

        let slot = pipeline
            .limiter
            .try_acquire(SLOT_WAIT_BUDGET, ct)
            .await
            .map_err(|_| GatewayError::Cancelled)?
            .ok_or(GatewayError::Busy)?;

        pipeline
            .rate_limiter
            .wait_if_needed(slot.id(), ct)
            .await
            .map_err(|_| GatewayError::Cancelled)?;

        let hits = match pipeline.provider.search(title, max_results, ct).await {
            Ok(hits) => hits,
            Err(ProviderError::Cancelled) => {
                slot.release();
                return Err(GatewayError::Cancelled);
            }
            Err(e) => {
                slot.release();
                tracing::warn!(event = "ProviderSearch", provider = provider_name, title, error = %e, "search failed, not recorded");
                return Err(GatewayError::UpstreamTransient(e));
            }
        };

        if hits.is_empty() {
            pipeline.rate_limiter.record_complete(slot.id());
            slot.release();
            tracing::info!(event = "ProviderSearch", provider = provider_name, title, hits = 0, "no matches");
            return Ok(Vec::new());
        }

        let enriched = enrich_hits(pipeline.provider.clone(), hits, ct).await;

        // §5: cancellation firing mid-fan-out must not be folded into an
        // ordinary per-hit failure — no recordComplete, no cache write, a
        // typed "cancelled" response, same as detail_by_id's cancellation arm.
        if enriched.cancelled || ct.is_cancelled() {
            slot.release();
            return Err(GatewayError::Cancelled);
        }

        pipeline.rate_limiter.record_complete(slot.id());
        slot.release();

        tracing::info!(event = "ProviderSearch", provider = provider_name, title, hits = enriched.results.len(), "search complete");
        Ok(enriched.results)
    }

    /// §4.7.3's redirect variant: pure id parse + URL build, no network,
    /// cache, or limiter interaction at all.
    pub fn redirect_target(&self, provider_name: &str, input: &str) -> Result<String, GatewayError> {
        let pipeline = self.pipeline(provider_name)?;
        let id = pipeline
            .provider
            .try_parse_id(input)
            .ok_or_else(|| GatewayError::InvalidInput(format!("Invalid id for provider {provider_name}: {input}")))?;
        Ok(pipeline.provider.build_detail_url(&id))
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    #[must_use]
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }
}

/// Outcome of one enrichment fetch, distinguishing the request's own
/// cancellation from an ordinary per-hit failure — §4.7.2's "per-hit errors
/// don't abort the batch" covers genuine upstream/parse failures, not the
/// fan-out's cancellation signal firing mid-flight (§5).
enum FetchOutcome {
    Found(Metadata),
    Missing,
    Cancelled,
}

/// Result of [`enrich_hits`]: the ordered, non-null metadata records plus
/// whether any in-flight fetch observed cancellation.
struct EnrichOutcome {
    results: Vec<Metadata>,
    cancelled: bool,
}

/// Fetches detail for each hit with at most [`SEARCH_FANOUT_DEGREE`]
/// concurrent in-flight calls, regardless of `hits.len()`. Per-hit errors
/// are logged and dropped, never abort the batch (§4.7.2). Results preserve
/// the original hit order, not completion order: each fetch is tagged with
/// its index so the out-of-order `FuturesUnordered` completions can be
/// slotted back into place.
async fn enrich_hits(
    provider: Arc<dyn Provider>,
    hits: Vec<SearchHit>,
    ct: &CancellationToken,
) -> EnrichOutcome {
    let total = hits.len();
    let mut in_flight = FuturesUnordered::new();
    let mut remaining = hits.into_iter().enumerate();
    let mut slots: Vec<Option<Metadata>> = (0..total).map(|_| None).collect();
    let mut cancelled = false;

    for (index, hit) in remaining.by_ref().take(SEARCH_FANOUT_DEGREE) {
        in_flight.push(fetch_one(Arc::clone(&provider), index, hit, ct.clone()));
    }

    while let Some((index, outcome)) = in_flight.next().await {
        if let Some((next_index, hit)) = remaining.next() {
            in_flight.push(fetch_one(Arc::clone(&provider), next_index, hit, ct.clone()));
        }
        match outcome {
            FetchOutcome::Found(metadata) => slots[index] = Some(metadata),
            FetchOutcome::Missing => {}
            FetchOutcome::Cancelled => cancelled = true,
        }
    }

    EnrichOutcome {
        results: slots.into_iter().flatten().collect(),
        cancelled,
    }
}

async fn fetch_one(provider: Arc<dyn Provider>, index: usize, hit: SearchHit, ct: CancellationToken) -> (usize, FetchOutcome) {
    let outcome = match provider.fetch_detail(&hit.detail_url, &ct).await {
        Ok(Some(metadata)) => FetchOutcome::Found(metadata),
        Ok(None) => FetchOutcome::Missing,
        Err(ProviderError::Cancelled) => FetchOutcome::Cancelled,
        Err(e) => {
            tracing::warn!(event = "ProviderDetail", url = hit.detail_url, error = %e, "per-hit enrichment failed, dropping");
            FetchOutcome::Missing
        }
    };
    (index, outcome)
}
