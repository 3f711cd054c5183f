//! A single long-lived browser context and the rotation-trigger checks from
//! §4.3. Grounded on the teacher's `PooledBrowserGuard`/`BrowserWrapper`
//! `Drop`-based cleanup, minus the checkout/guard part: a context here is
//! shared (via `Arc`) across concurrent page opens, not checked out
//! exclusively per request.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser_pool::rotation::RotatableContext;
use crate::config::BrowserPoolConfig;

pub struct BrowserContext {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    config: BrowserPoolConfig,
    birth: Instant,
    pages_opened: AtomicU32,
    challenge_flag: AtomicBool,
}

impl BrowserContext {
    pub(super) fn new(browser: Browser, handler_task: JoinHandle<()>, config: BrowserPoolConfig) -> Self {
        Self {
            browser: Mutex::new(browser),
            handler_task,
            config,
            birth: Instant::now(),
            pages_opened: AtomicU32::new(0),
            challenge_flag: AtomicBool::new(false),
        }
    }

    pub(super) async fn new_page(&self, url: &str) -> chromiumoxide::Result<chromiumoxide::page::Page> {
        self.browser.lock().await.new_page(url).await
    }

    /// Every page opened increments this exactly once, regardless of
    /// whether the page later closes cleanly (§4.3).
    pub(super) fn page_opened(&self) {
        self.pages_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn mark_challenged(&self) {
        self.challenge_flag.store(true, Ordering::Relaxed);
    }

    pub(super) fn is_connected(&self) -> bool {
        !self.handler_task.is_finished()
    }

    pub(super) fn is_expired(&self) -> bool {
        let ttl = Duration::from_secs(self.config.context_ttl_minutes() * 60);
        self.birth.elapsed() > ttl
            || self.pages_opened.load(Ordering::Relaxed) >= self.config.max_pages_per_context()
            || (self.config.rotate_on_challenge_detected() && self.challenge_flag.load(Ordering::Relaxed))
    }

    pub(super) async fn close(&self) {
        self.handler_task.abort();
        if let Err(e) = self.browser.lock().await.close().await {
            tracing::debug!(event = "BrowserCloseFailed", error = %e, "ignoring close error on retired context");
        }
    }
}

#[async_trait]
impl RotatableContext for BrowserContext {
    fn needs_rotation(&self) -> bool {
        self.is_expired() || !self.is_connected()
    }

    async fn retire(&self) {
        self.close().await;
    }
}
