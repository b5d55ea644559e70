//! Cache storage for scraped stats records.
//!
//! Every record lives under one TTL-bound key per player and view:
//!
//! ```text
//! <ns>:stats:<platform>:<tag>           # full stats
//! <ns>:stats:<platform>:<tag>:profile   # summary
//! ```
//!
//! Backends only see opaque bytes; [`StatsCache`] owns the key scheme and the
//! JSON encoding.

pub mod local;
pub mod memory;
pub mod redis_store;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CacheBackend, CacheConfig, StatsRecord, StatsRequest, ViewKind};

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

const STATS_SEGMENT: &str = "stats";
const PROFILE_SUFFIX: &str = "profile";

/// Trait for TTL key-value cache backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write an entry that expires after `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// List live keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove an entry if present.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Open the configured backend, or `None` when caching is disabled.
pub fn open_store(config: &CacheConfig) -> Result<Option<Arc<dyn CacheStore>>> {
    if !config.enabled {
        return Ok(None);
    }
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::Local => Arc::new(LocalStore::new(&config.dir)),
        CacheBackend::Redis => Arc::new(RedisStore::open(&config.url)?),
    };
    Ok(Some(store))
}

/// Structured form of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub platform: String,
    pub tag: String,
    pub view: ViewKind,
}

impl CacheKey {
    pub fn new(namespace: &str, request: &StatsRequest) -> Self {
        Self {
            namespace: namespace.to_string(),
            platform: request.platform.clone(),
            tag: request.tag.clone(),
            view: request.view,
        }
    }

    /// Prefix shared by every stats key of a namespace.
    pub fn prefix(namespace: &str) -> String {
        format!("{namespace}:{STATS_SEGMENT}:")
    }

    /// Parse a rendered key back into its parts.
    pub fn parse(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split(':').collect();
        let view = match parts.as_slice() {
            [_, STATS_SEGMENT, _, _] => ViewKind::Full,
            [_, STATS_SEGMENT, _, _, PROFILE_SUFFIX] => ViewKind::Summary,
            _ => return None,
        };
        if parts[..4].iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self {
            namespace: parts[0].to_string(),
            platform: parts[2].to_string(),
            tag: parts[3].to_string(),
            view,
        })
    }

    pub fn request(&self) -> StatsRequest {
        StatsRequest::new(&self.platform, &self.tag, self.view)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{STATS_SEGMENT}:{}:{}",
            self.namespace, self.platform, self.tag
        )?;
        if self.view == ViewKind::Summary {
            write!(f, ":{PROFILE_SUFFIX}")?;
        }
        Ok(())
    }
}

/// Typed access to stats records in a [`CacheStore`].
#[derive(Clone)]
pub struct StatsCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
}

impl StatsCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Cache over the configured backend, `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Result<Option<Self>> {
        Ok(open_store(config)?.map(|store| Self::new(store, &config.namespace, config.ttl())))
    }

    pub fn key_for(&self, request: &StatsRequest) -> CacheKey {
        CacheKey::new(&self.namespace, request)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read the record cached for a request.
    pub async fn get(&self, request: &StatsRequest) -> Result<Option<StatsRecord>> {
        let key = self.key_for(request).to_string();
        match self.store.get(&key).await? {
            Some(bytes) => StatsRecord::from_json(request.view, &bytes)
                .map(Some)
                .map_err(|e| AppError::cache(format!("malformed entry {key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Store a record for a request with the configured TTL.
    pub async fn put(&self, request: &StatsRequest, record: &StatsRecord) -> Result<()> {
        let key = self.key_for(request).to_string();
        let bytes = record.to_json()?;
        self.store.set(&key, &bytes, self.ttl).await?;
        log::debug!("Cached {key} for {}s", self.ttl.as_secs());
        Ok(())
    }

    /// Every cached key of this namespace, parsed.
    pub async fn cached_keys(&self) -> Result<Vec<CacheKey>> {
        let prefix = CacheKey::prefix(&self.namespace);
        let mut keys: Vec<CacheKey> = self
            .store
            .keys(&prefix)
            .await?
            .into_iter()
            .filter_map(|raw| {
                let parsed = CacheKey::parse(&raw);
                if parsed.is_none() {
                    log::warn!("Ignoring unparseable cache key {raw}");
                }
                parsed
            })
            .collect();
        keys.sort_by_key(|k| k.to_string());
        Ok(keys)
    }

    pub async fn remove(&self, request: &StatsRequest) -> Result<()> {
        self.store.delete(&self.key_for(request).to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerStats, PlayerStatsProfile};

    #[test]
    fn test_key_rendering() {
        let full = CacheKey::new("ow", &StatsRequest::full("pc", "Player-1234"));
        assert_eq!(full.to_string(), "ow:stats:pc:Player-1234");

        let summary = CacheKey::new("ow", &StatsRequest::summary("pc", "Player-1234"));
        assert_eq!(summary.to_string(), "ow:stats:pc:Player-1234:profile");
        assert_eq!(CacheKey::prefix("ow"), "ow:stats:");
    }

    #[test]
    fn test_key_parsing() {
        let key = CacheKey::parse("ow:stats:console:Player-1234:profile").unwrap();
        assert_eq!(key.namespace, "ow");
        assert_eq!(key.platform, "console");
        assert_eq!(key.tag, "Player-1234");
        assert_eq!(key.view, ViewKind::Summary);
        assert_eq!(
            key.request(),
            StatsRequest::summary("console", "Player-1234")
        );

        assert_eq!(
            CacheKey::parse("ow:stats:pc:Player-1234").unwrap().view,
            ViewKind::Full
        );
        assert!(CacheKey::parse("ow:stats:pc").is_none());
        assert!(CacheKey::parse("ow:news:pc:Player-1234").is_none());
        assert!(CacheKey::parse("ow:stats:pc:Player-1234:other").is_none());
        assert!(CacheKey::parse("ow:stats::Player-1234").is_none());
    }

    #[tokio::test]
    async fn test_stats_cache_round_trip() {
        let cache = StatsCache::new(Arc::new(MemoryStore::new()), "ow", Duration::from_secs(60));
        let full = StatsRequest::full("pc", "Player-1234");
        let summary = StatsRequest::summary("pc", "Player-1234");

        let record = StatsRecord::Full(PlayerStats {
            name: "Player".into(),
            ..PlayerStats::default()
        });
        cache.put(&full, &record).await.unwrap();
        cache
            .put(&summary, &StatsRecord::Summary(PlayerStatsProfile::private()))
            .await
            .unwrap();

        assert_eq!(cache.get(&full).await.unwrap(), Some(record));
        assert!(cache.get(&summary).await.unwrap().unwrap().is_private());
        assert!(
            cache
                .get(&StatsRequest::full("pc", "Other-1"))
                .await
                .unwrap()
                .is_none()
        );

        let keys = cache.cached_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].view, ViewKind::Full);
        assert_eq!(keys[1].view, ViewKind::Summary);

        cache.remove(&full).await.unwrap();
        assert!(cache.get(&full).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_entry_is_cache_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("ow:stats:pc:Player-1234", b"not json", Duration::from_secs(60))
            .await
            .unwrap();

        let cache = StatsCache::new(store, "ow", Duration::from_secs(60));
        let result = cache.get(&StatsRequest::full("pc", "Player-1234")).await;
        assert!(matches!(result, Err(AppError::Cache(_))));
    }

    #[test]
    fn test_disabled_cache_has_no_store() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(StatsCache::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_redis_backend_with_bad_url_fails_to_open() {
        let config = CacheConfig {
            backend: CacheBackend::Redis,
            url: "not a url".to_string(),
            ..CacheConfig::default()
        };
        assert!(matches!(
            StatsCache::from_config(&config),
            Err(AppError::Config(_))
        ));

        let config = CacheConfig {
            backend: CacheBackend::Redis,
            ..CacheConfig::default()
        };
        assert!(StatsCache::from_config(&config).unwrap().is_some());
    }
}
