//! Browser context pool (§4.3): one or two long-lived browser contexts with
//! TTL/page-count/challenge-aware rotation, fronting the anti-bot traffic
//! the HTTP client can't handle.
//!
//! Grounded on the teacher's `browser_pool::mod` (RAII lifecycle, `Arc<Self>`,
//! background event-handler `JoinHandle` tracked for cleanup on drop) and
//! `web_search::browser` (stealth launch args, page navigation mechanics).
//! The teacher's pool shape — N pre-warmed, interchangeable browsers checked
//! out per crawl — doesn't fit §4.3's "one or two named roles, rotated by
//! policy" model, so the checkout/guard machinery is replaced by a per-role
//! slot that is looked up, rotated in place, and never exclusively owned by
//! a single request (pages within one context can be opened concurrently).

mod challenge;
mod context;
pub mod rotation;

pub use challenge::detect_challenge;
pub use context::BrowserContext;
pub use rotation::{RotatableContext, RotatingSlot};

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::BrowserPoolConfig;
use crate::error::ProviderError;

/// Which named role a context serves. In [`crate::config::IsolationMode::Shared`]
/// both map to the same underlying context; in `SplitSearchDetail` each gets
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Search,
    Detail,
}

pub struct BrowserContextPool {
    config: BrowserPoolConfig,
    search_slot: RotatingSlot<BrowserContext>,
    detail_slot: RotatingSlot<BrowserContext>,
}

impl BrowserContextPool {
    #[must_use]
    pub fn new(config: BrowserPoolConfig) -> Self {
        Self {
            config,
            search_slot: RotatingSlot::new(),
            detail_slot: RotatingSlot::new(),
        }
    }

    fn slot_for(&self, role: Role) -> &RotatingSlot<BrowserContext> {
        match (self.config.isolation_mode(), role) {
            (crate::config::IsolationMode::Shared, _) => &self.search_slot,
            (crate::config::IsolationMode::SplitSearchDetail, Role::Search) => &self.search_slot,
            (crate::config::IsolationMode::SplitSearchDetail, Role::Detail) => &self.detail_slot,
        }
    }

    /// Looks up the context for `role`, rotating (closing and relaunching)
    /// it if it's expired by any of §4.3's rules. Rotation is serialized per
    /// role via the slot's own mutex, so two concurrent lookups never launch
    /// two replacement browsers.
    async fn acquire_context(&self, role: Role) -> Result<Arc<BrowserContext>, ProviderError> {
        let slot = self.slot_for(role);
        let config = self.config.clone();
        slot.acquire(move || async move {
            tracing::info!(event = "BrowserContextRotated", role = ?role, "launching browser context");
            launch_context(&config).await
        })
        .await
    }

    /// Opens `url` and returns rendered HTML, retrying once with a slower
    /// timeout budget on primary failure or detected challenge (§4.3).
    pub async fn get_html(&self, role: Role, url: &str, ct: &CancellationToken) -> Result<String, ProviderError> {
        let ctx = self.acquire_context(role).await?;

        match self.try_open(&ctx, url, Duration::from_secs(15), ct).await {
            Ok(html) if !self.is_challenge(url, &html) => Ok(html),
            primary_result => {
                tracing::warn!(event = "BrowserChallengeRetry", url, "retrying navigation with slow-retry budget");
                let retried = self.try_open(&ctx, url, Duration::from_secs(45), ct).await?;
                if self.is_challenge(url, &retried) {
                    return Err(match primary_result {
                        Err(e) => e,
                        Ok(_) => ProviderError::Challenge,
                    });
                }
                // Slow retry succeeded where the primary attempt didn't: flag this
                // context so the next acquisition rotates it out (§4.3).
                ctx.mark_challenged();
                Ok(retried)
            }
        }
    }

    /// Opens a live page handle whose lifetime the caller owns (§4.2's
    /// `openBrowserPage`). No retry here — callers driving a page directly
    /// are expected to handle their own navigation lifecycle.
    pub async fn open_page(&self, role: Role, url: &str) -> Result<Page, ProviderError> {
        let ctx = self.acquire_context(role).await?;
        let page = ctx
            .new_page(url)
            .await
            .map_err(|e| ProviderError::Browser(e.to_string()))?;
        ctx.page_opened();
        configure_page_emulation(&page, &self.config).await?;
        Ok(page)
    }

    async fn try_open(
        &self,
        ctx: &BrowserContext,
        url: &str,
        navigation_timeout: Duration,
        ct: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let page = ctx
            .new_page(url)
            .await
            .map_err(|e| ProviderError::Browser(e.to_string()))?;
        ctx.page_opened();
        configure_page_emulation(&page, &self.config).await?;

        let navigate = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| ProviderError::Browser(e.to_string()))?;
            wait_for_any_ready_selector(&page, self.config.ready_selectors()).await;
            run_antibot_hook(&page, ct).await;
            page.content()
                .await
                .map_err(|e| ProviderError::Browser(e.to_string()))
        };

        let result = tokio::select! {
            _ = ct.cancelled() => Err(ProviderError::Cancelled),
            r = tokio::time::timeout(navigation_timeout, navigate) => {
                r.map_err(|_| ProviderError::Browser("navigation timed out".to_string()))?
            }
        };

        let _ = page.close().await;
        result
    }

    fn is_challenge(&self, url: &str, html: &str) -> bool {
        challenge::detect_challenge(url, html, &self.config)
    }

    /// Closes any live contexts in both roles. Called once on service
    /// shutdown (§4.8's `ServiceShutdown` event); safe to call even if a
    /// role was never acquired.
    pub async fn shutdown(&self) {
        self.search_slot.close().await;
        self.detail_slot.close().await;
    }
}

async fn launch_context(config: &BrowserPoolConfig) -> Result<BrowserContext, ProviderError> {
    let (width, height) = config.viewport();
    let browser_config = BrowserConfig::builder()
        .viewport(Some(chromiumoxide::handler::viewport::Viewport {
            width,
            height,
            ..Default::default()
        }))
        .user_agent(config.user_agent())
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--lang={}", config.locale()))
        .build()
        .map_err(|e| ProviderError::Browser(format!("invalid browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| ProviderError::Browser(e.to_string()))?;

    let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

    Ok(BrowserContext::new(browser, handler_task, config.clone()))
}

/// Applies the per-page emulation knobs that have no `--lang`-style launch
/// argument: `AcceptLanguage` (a CDP user-agent override, distinct from the
/// browser-launch `--lang` flag that drives `locale()`) and `TimezoneId` (a
/// CDP timezone override), via the same `page.execute(cdp::...)` mechanism
/// the teacher's own stealth-injection step uses for its user-agent override.
async fn configure_page_emulation(page: &Page, config: &BrowserPoolConfig) -> Result<(), ProviderError> {
    use chromiumoxide::cdp;

    page.execute(cdp::browser_protocol::network::SetUserAgentOverrideParams {
        user_agent: config.user_agent().to_string(),
        accept_language: Some(config.accept_language().to_string()),
        platform: None,
        user_agent_metadata: None,
    })
    .await
    .map_err(|e| ProviderError::Browser(e.to_string()))?;

    page.execute(cdp::browser_protocol::emulation::SetTimezoneOverrideParams {
        timezone_id: config.timezone_id().to_string(),
    })
    .await
    .map_err(|e| ProviderError::Browser(e.to_string()))?;

    Ok(())
}

/// Polls for any of the configured `readySelectors` (§4.3 step 1), giving up
/// after a short bounded budget rather than failing the whole navigation —
/// a page missing every hint is still returned for challenge detection to
/// classify, not treated as a hard error.
async fn wait_for_any_ready_selector(page: &Page, selectors: &[String]) {
    if selectors.is_empty() {
        return;
    }
    let budget = Duration::from_secs(5);
    let poll_interval = Duration::from_millis(200);
    let deadline = tokio::time::Instant::now() + budget;

    loop {
        for selector in selectors {
            if page.find_element(selector.as_str()).await.is_ok() {
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Random mouse movement / scrolling over 1-3s, bounded by `ct`. Best
/// effort: any failure is logged and swallowed, never propagated (§4.3).
async fn run_antibot_hook(page: &Page, ct: &CancellationToken) {
    use rand::Rng;
    let duration = {
        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(1000..3000))
    };

    let hook = async {
        let steps = {
            let mut rng = rand::rng();
            rng.random_range(3..8)
        };
        for _ in 0..steps {
            let (x, y) = {
                let mut rng = rand::rng();
                (rng.random_range(0.0..1280.0), rng.random_range(0.0..800.0))
            };
            if let Err(e) = page.move_mouse(chromiumoxide::layout::Point::new(x, y)).await {
                tracing::debug!(event = "AntiBotHookFailed", error = %e, "mouse move failed, continuing");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };

    tokio::select! {
        _ = ct.cancelled() => {}
        _ = tokio::time::timeout(duration, hook) => {}
    }
}
