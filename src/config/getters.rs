//! `#[must_use]` read accessors for [`GatewayConfig`], matching the teacher's
//! split of a plain struct's public surface into its own file.

use super::types::{BrowserPoolConfig, CacheConfig, GatewayConfig, ProviderConfig};

impl GatewayConfig {
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    #[must_use]
    pub fn token_header_name(&self) -> &str {
        &self.token_header_name
    }

    #[must_use]
    pub fn request_timeout_seconds(&self) -> u64 {
        self.request_timeout_seconds
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    #[must_use]
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn browser_pool(&self) -> &BrowserPoolConfig {
        &self.browser_pool
    }

    #[must_use]
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}

impl BrowserPoolConfig {
    #[must_use]
    pub fn context_ttl_minutes(&self) -> u64 {
        self.context_ttl_minutes
    }

    #[must_use]
    pub fn max_pages_per_context(&self) -> u32 {
        self.max_pages_per_context
    }

    #[must_use]
    pub fn rotate_on_challenge_detected(&self) -> bool {
        self.rotate_on_challenge_detected
    }

    #[must_use]
    pub fn isolation_mode(&self) -> super::types::IsolationMode {
        self.isolation_mode
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn timezone_id(&self) -> &str {
        &self.timezone_id
    }

    #[must_use]
    pub fn accept_language(&self) -> &str {
        &self.accept_language
    }

    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    #[must_use]
    pub fn challenge_url_hints(&self) -> &[String] {
        &self.challenge_url_hints
    }

    #[must_use]
    pub fn challenge_dom_hints(&self) -> &[String] {
        &self.challenge_dom_hints
    }

    #[must_use]
    pub fn ready_selectors(&self) -> &[String] {
        &self.ready_selectors
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_seconds)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
