//! S4: with N concurrency slots and a fixed per-slot cadence, back-to-back
//! requests for distinct uncached ids are throttled to roughly
//! `(ceil(requests / slots) - 1) * cadence` wall time, not run unthrottled.
//!
//! Scaled down from the spec's illustrative N=2/T=1s/6-requests numbers to
//! keep the test fast in real wall-clock time; the rate limiter measures
//! real elapsed time internally (it isn't driven by `tokio::time::pause`),
//! so the scenario runs for real rather than under virtual time.

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use mediascrape_gateway::cache::MetadataCache;
use mediascrape_gateway::limiter::ConcurrencyLimiter;
use mediascrape_gateway::orchestrator::{Orchestrator, ProviderPipeline};
use mediascrape_gateway::provider::Provider;
use mediascrape_gateway::rate_limiter::SlotRateLimiter;

use support::StubProvider;

#[tokio::test]
async fn rate_limited_requests_take_roughly_the_expected_cadence_rounds() {
    const SLOTS: usize = 2;
    const CADENCE: Duration = Duration::from_millis(150);
    const REQUESTS: u32 = 6;

    let stub: Arc<StubProvider> = Arc::new(StubProvider::new("dlsite"));
    let provider: Arc<dyn Provider> = stub;

    let mut pipelines: HashMap<String, ProviderPipeline> = HashMap::new();
    pipelines.insert(
        "dlsite".to_string(),
        ProviderPipeline {
            provider,
            limiter: ConcurrencyLimiter::new(SLOTS),
            rate_limiter: SlotRateLimiter::new(CADENCE),
        },
    );
    let cache = Arc::new(MetadataCache::new(1_000, Duration::from_secs(3600)));
    let orchestrator = Arc::new(Orchestrator::new(pipelines, cache));

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..REQUESTS {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let ct = CancellationToken::new();
            orchestrator.detail_by_id("dlsite", &format!("RJ{i:06}"), &ct).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    let elapsed = start.elapsed();

    // Six requests over two slots means three completions per slot, i.e.
    // two cadence gaps per slot, run in parallel across both slots.
    let rounds_per_slot = REQUESTS.div_ceil(SLOTS as u32);
    let expected = CADENCE * (rounds_per_slot - 1);

    assert!(
        elapsed >= expected.saturating_sub(Duration::from_millis(40)),
        "cadence should enforce at least ~{expected:?} between the first and last completion on a slot, took {elapsed:?}"
    );
    assert!(
        elapsed < expected + Duration::from_millis(400),
        "cadence enforcement should not stall far beyond ~{expected:?}, took {elapsed:?}"
    );
}
