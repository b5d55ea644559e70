//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream site and HTTP client settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Cache store settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Caller-facing deadline settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Periodic rescrape settings
    #[serde(default)]
    pub rescraper: RescraperConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.user_agent.trim().is_empty() {
            return Err(AppError::validation("upstream.user_agent is empty"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::validation("upstream.timeout_secs must be > 0"));
        }
        if self.upstream.max_redirect_hops == 0 {
            return Err(AppError::validation(
                "upstream.max_redirect_hops must be > 0",
            ));
        }
        url::Url::parse(&self.upstream.base_url).map_err(|e| {
            AppError::validation(format!("upstream.base_url is not a URL: {e}"))
        })?;
        if self.upstream.locale.trim().is_empty() {
            return Err(AppError::validation("upstream.locale is empty"));
        }
        if self.cache.namespace.is_empty() || self.cache.namespace.contains(':') {
            return Err(AppError::validation(
                "cache.namespace must be non-empty and contain no ':'",
            ));
        }
        if self.cache.backend == CacheBackend::Redis {
            let url = url::Url::parse(&self.cache.url)
                .map_err(|e| AppError::validation(format!("cache.url is not a URL: {e}")))?;
            if !matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
                return Err(AppError::validation(format!(
                    "cache.url has unsupported scheme {}",
                    url.scheme()
                )));
            }
        }
        if self.cache.ttl_secs == 0 {
            return Err(AppError::validation("cache.ttl_secs must be > 0"));
        }
        if self.api.timeout_ms == 0 {
            return Err(AppError::validation("api.timeout_ms must be > 0"));
        }
        if self.rescraper.interval_secs == 0 {
            return Err(AppError::validation("rescraper.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Upstream site and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Scheme and host of the profile site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Locale path segment, e.g. `en-us`
    #[serde(default = "defaults::locale")]
    pub locale: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Redirect hops followed while resolving a career locator
    #[serde(default = "defaults::max_redirect_hops")]
    pub max_redirect_hops: usize,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            locale: defaults::locale(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_redirect_hops: defaults::max_redirect_hops(),
        }
    }
}

/// Which cache store implementation backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    #[default]
    Local,
    Redis,
}

impl std::str::FromStr for CacheBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "local" => Ok(CacheBackend::Local),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(AppError::config(format!("unknown cache backend {other:?}"))),
        }
    }
}

/// Cache store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::cache_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    /// Directory used by the local backend
    #[serde(default = "defaults::cache_dir")]
    pub dir: String,

    /// Server URL used by the redis backend
    #[serde(default = "defaults::cache_url")]
    pub url: String,

    /// Key namespace, the `<ns>` in `<ns>:stats:<platform>:<tag>`
    #[serde(default = "defaults::namespace")]
    pub namespace: String,

    /// Entry time-to-live in seconds
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::cache_enabled(),
            backend: CacheBackend::default(),
            dir: defaults::cache_dir(),
            url: defaults::cache_url(),
            namespace: defaults::namespace(),
            ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Caller-facing deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// How long a caller waits for a live scrape, in milliseconds
    #[serde(default = "defaults::api_timeout")]
    pub timeout_ms: u64,

    /// Upper bound on concurrently running background refreshes
    #[serde(default = "defaults::max_background_refreshes")]
    pub max_background_refreshes: usize,
}

impl ApiConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::api_timeout(),
            max_background_refreshes: defaults::max_background_refreshes(),
        }
    }
}

/// Periodic rescrape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescraperConfig {
    /// Seconds between full passes over the cache
    #[serde(default = "defaults::rescrape_interval")]
    pub interval_secs: u64,

    /// Delay between two upstream calls in milliseconds
    #[serde(default = "defaults::rescrape_delay")]
    pub delay_ms: u64,
}

impl RescraperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RescraperConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::rescrape_interval(),
            delay_ms: defaults::rescrape_delay(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Upstream defaults
    pub fn base_url() -> String {
        "https://overwatch.blizzard.com".into()
    }
    pub fn locale() -> String {
        "en-us".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; owstats/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_redirect_hops() -> usize {
        5
    }

    // Cache defaults
    pub fn cache_enabled() -> bool {
        true
    }
    pub fn cache_dir() -> String {
        "storage/cache".into()
    }
    pub fn cache_url() -> String {
        "redis://127.0.0.1:6379".into()
    }
    pub fn namespace() -> String {
        "ow".into()
    }
    pub fn cache_ttl() -> u64 {
        24 * 60 * 60
    }

    // API defaults
    pub fn api_timeout() -> u64 {
        5_000
    }
    pub fn max_background_refreshes() -> usize {
        16
    }

    // Rescraper defaults
    pub fn rescrape_interval() -> u64 {
        60 * 60
    }
    pub fn rescrape_delay() -> u64 {
        2_000
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.upstream.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_namespace_with_separator() {
        let mut config = Config::default();
        config.cache.namespace = "ow:test".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.upstream.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_checks_redis_url_only_for_redis_backend() {
        let mut config = Config::default();
        config.cache.url = "http://127.0.0.1:6379".to_string();
        assert!(config.validate().is_ok());

        config.cache.backend = CacheBackend::Redis;
        assert!(config.validate().is_err());

        config.cache.url = "redis://cache.internal:6379/2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cache_backend_from_str() {
        assert_eq!("Redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!("memory".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert!("s3".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            backend = "memory"
            ttl_secs = 60

            [api]
            timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.namespace, "ow");
        assert_eq!(config.api.deadline(), Duration::from_millis(250));
        assert_eq!(config.upstream.max_redirect_hops, 5);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(15));
    }
}
