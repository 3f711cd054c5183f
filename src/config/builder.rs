//! Chained-setter builder for [`GatewayConfig`], applying the two named
//! environment overrides from §6 last so they always win.

use super::types::{BrowserPoolConfig, CacheConfig, GatewayConfig, ProviderConfig};

#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn token_header_name(mut self, name: impl Into<String>) -> Self {
        self.config.token_header_name = name.into();
        self
    }

    #[must_use]
    pub fn request_timeout_seconds(mut self, secs: u64) -> Self {
        self.config.request_timeout_seconds = secs;
        self
    }

    #[must_use]
    pub fn provider(mut self, name: impl Into<String>, provider: ProviderConfig) -> Self {
        self.config.providers.insert(name.into(), provider);
        self
    }

    #[must_use]
    pub fn browser_pool(mut self, browser_pool: BrowserPoolConfig) -> Self {
        self.config.browser_pool = browser_pool;
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Applies `SCRAPER_PORT`/`SCRAPER_AUTH_TOKEN` over whatever was set via
    /// the builder, per §6's "environment variable overrides" list. No other
    /// keys are ever loaded from the environment or a file.
    #[must_use]
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("SCRAPER_PORT") {
            if let Ok(parsed) = port.parse() {
                self.config.port = parsed;
            } else {
                tracing::warn!(event = "ServiceStartup", value = %port, "ignoring malformed SCRAPER_PORT");
            }
        }
        if let Ok(token) = std::env::var("SCRAPER_AUTH_TOKEN") {
            self.config.auth_token = Some(token);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
