//! Core configuration types for the gateway.
//!
//! Mirrors the teacher's split between a plain data struct (this file),
//! a chained-setter builder (`builder.rs`), and `#[must_use]` accessors
//! (`getters.rs`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-provider knobs: §6 is explicit that `MaxConcurrentRequests` and
/// `RateLimitSeconds` are scoped per provider, not global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub(crate) route_prefix: String,
    pub(crate) base_url: String,
    pub(crate) max_concurrent_requests: usize,
    pub(crate) rate_limit_seconds: f64,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(
        route_prefix: impl Into<String>,
        base_url: impl Into<String>,
        max_concurrent_requests: usize,
        rate_limit_seconds: f64,
    ) -> Self {
        Self {
            route_prefix: route_prefix.into(),
            base_url: base_url.into(),
            max_concurrent_requests,
            rate_limit_seconds,
        }
    }

    #[must_use]
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// `0` disables the rate limiter for this provider (§4.5).
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_seconds.max(0.0))
    }
}

/// Browser context pool knobs (§4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserPoolConfig {
    pub(crate) context_ttl_minutes: u64,
    pub(crate) max_pages_per_context: u32,
    pub(crate) rotate_on_challenge_detected: bool,
    pub(crate) isolation_mode: IsolationMode,
    pub(crate) user_agent: String,
    pub(crate) locale: String,
    pub(crate) timezone_id: String,
    pub(crate) accept_language: String,
    pub(crate) viewport_width: u32,
    pub(crate) viewport_height: u32,
    pub(crate) challenge_url_hints: Vec<String>,
    pub(crate) challenge_dom_hints: Vec<String>,
    pub(crate) ready_selectors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IsolationMode {
    Shared,
    SplitSearchDetail,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            context_ttl_minutes: 30,
            max_pages_per_context: 200,
            rotate_on_challenge_detected: true,
            isolation_mode: IsolationMode::SplitSearchDetail,
            user_agent: crate::network::DEFAULT_USER_AGENT.to_string(),
            locale: "en-US".to_string(),
            timezone_id: "UTC".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            challenge_url_hints: vec!["/cdn-cgi/challenge-platform/".to_string()],
            challenge_dom_hints: vec!["Just a moment".to_string(), "cf-chl".to_string()],
            ready_selectors: vec!["body".to_string()],
        }
    }
}

/// Cache knobs (§4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub(crate) ttl_seconds: u64,
    pub(crate) capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 6 * 3600,
            capacity: 10_000,
        }
    }
}

/// Top-level service configuration (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) auth_token: Option<String>,
    pub(crate) token_header_name: String,
    pub(crate) request_timeout_seconds: u64,
    pub(crate) providers: std::collections::BTreeMap<String, ProviderConfig>,
    pub(crate) browser_pool: BrowserPoolConfig,
    pub(crate) cache: CacheConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut providers = std::collections::BTreeMap::new();
        providers.insert(
            "dlsite".to_string(),
            ProviderConfig::new("dlsite", "https://example-doujin.test", 2, 1.0),
        );
        providers.insert(
            "hanime".to_string(),
            ProviderConfig::new("hanime", "https://example-streaming.test", 2, 1.0),
        );

        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            auth_token: None,
            token_header_name: "X-API-Token".to_string(),
            request_timeout_seconds: 150,
            providers,
            browser_pool: BrowserPoolConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}
