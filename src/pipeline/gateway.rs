// src/pipeline/gateway.rs

//! Freshness-bounded access to stats records.
//!
//! A request first gets a live scrape limited by the caller deadline. When the
//! deadline passes, the live run is abandoned and the cached record (if any)
//! is served while a bounded background task refreshes the entry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, PlayerStats, PlayerStatsProfile, StatsRecord, StatsRequest};
use crate::services::StatsSource;
use crate::storage::StatsCache;

/// Where a returned record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Live,
    Cache,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Live => f.write_str("live"),
            Source::Cache => f.write_str("cache"),
        }
    }
}

/// A record together with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub record: StatsRecord,
    pub source: Source,
}

/// Deadline-bounded gateway in front of a [`StatsSource`].
pub struct FreshnessGateway {
    source: Arc<dyn StatsSource>,
    cache: Option<StatsCache>,
    deadline: Duration,
    max_refreshes: usize,
    refresh_slots: Arc<Semaphore>,
    refreshes_scheduled: AtomicUsize,
}

impl FreshnessGateway {
    pub fn new(
        source: Arc<dyn StatsSource>,
        cache: Option<StatsCache>,
        deadline: Duration,
        max_background_refreshes: usize,
    ) -> Self {
        let max_refreshes = max_background_refreshes.max(1);
        Self {
            source,
            cache,
            deadline,
            max_refreshes,
            refresh_slots: Arc::new(Semaphore::new(max_refreshes)),
            refreshes_scheduled: AtomicUsize::new(0),
        }
    }

    pub fn from_config(
        source: Arc<dyn StatsSource>,
        cache: Option<StatsCache>,
        config: &ApiConfig,
    ) -> Self {
        Self::new(
            source,
            cache,
            config.deadline(),
            config.max_background_refreshes,
        )
    }

    /// Number of background refreshes scheduled so far.
    pub fn refreshes_scheduled(&self) -> usize {
        self.refreshes_scheduled.load(Ordering::Relaxed)
    }

    /// Background refreshes currently running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.max_refreshes - self.refresh_slots.available_permits()
    }

    /// Wait until every scheduled background refresh has finished.
    pub async fn wait_for_refreshes(&self) {
        let Ok(all) = u32::try_from(self.max_refreshes) else {
            return;
        };
        if let Ok(permits) = self.refresh_slots.acquire_many(all).await {
            drop(permits);
        }
    }

    /// Run the live pipeline, abandoning it with `Timeout` at the deadline.
    async fn run_live(&self, request: &StatsRequest) -> Result<StatsRecord> {
        let source = Arc::clone(&self.source);
        let live_request = request.clone();
        let mut live = tokio::spawn(async move { source.fetch(&live_request).await });

        match tokio::time::timeout(self.deadline, &mut live).await {
            Ok(joined) => joined?,
            Err(_) => {
                live.abort();
                Err(AppError::Timeout)
            }
        }
    }

    /// Serve a request live if possible, from cache otherwise.
    pub async fn get_with_fallback(&self, request: &StatsRequest) -> Result<Fetched> {
        let record = match self.run_live(request).await {
            Ok(record) => record,
            Err(AppError::Timeout) => {
                log::info!(
                    "Live scrape of {request} exceeded {}ms, falling back to cache",
                    self.deadline.as_millis()
                );
                return self.fallback(request).await;
            }
            Err(e) => return Err(e),
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(request, &record).await {
                log::warn!("Caching {request} failed: {e}");
            }
        }
        Ok(Fetched {
            record,
            source: Source::Live,
        })
    }

    /// Full stats of a player and their origin.
    pub async fn full(&self, platform: &str, tag: &str) -> Result<(PlayerStats, Source)> {
        let fetched = self
            .get_with_fallback(&StatsRequest::full(platform, tag))
            .await?;
        let source = fetched.source;
        fetched
            .record
            .into_full()
            .map(|stats| (stats, source))
            .ok_or_else(|| AppError::cache("cached record is not a full stats record"))
    }

    /// Summary stats of a player and their origin.
    pub async fn summary(&self, platform: &str, tag: &str) -> Result<(PlayerStatsProfile, Source)> {
        let fetched = self
            .get_with_fallback(&StatsRequest::summary(platform, tag))
            .await?;
        let source = fetched.source;
        fetched
            .record
            .into_summary()
            .map(|profile| (profile, source))
            .ok_or_else(|| AppError::cache("cached record is not a summary record"))
    }

    async fn fallback(&self, request: &StatsRequest) -> Result<Fetched> {
        let Some(cache) = &self.cache else {
            return Err(AppError::ScrapePending);
        };

        let cached = match cache.get(request).await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Cache read for {request} failed: {e}");
                None
            }
        };

        self.schedule_refresh(request.clone(), cache.clone());

        match cached {
            Some(record) => Ok(Fetched {
                record,
                source: Source::Cache,
            }),
            None => Err(AppError::ScrapePending),
        }
    }

    /// Re-run the pipeline in the background and overwrite the cache entry.
    fn schedule_refresh(&self, request: StatsRequest, cache: StatsCache) -> bool {
        let Ok(permit) = Arc::clone(&self.refresh_slots).try_acquire_owned() else {
            log::warn!(
                "Skipping refresh of {request}: {} refreshes already running",
                self.max_refreshes
            );
            return false;
        };
        self.refreshes_scheduled.fetch_add(1, Ordering::Relaxed);

        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let _permit = permit;
            match source.fetch(&request).await {
                Ok(record) => match cache.put(&request, &record).await {
                    Ok(()) => log::info!("Refreshed {request} in background"),
                    Err(e) => log::warn!("Caching refreshed {request} failed: {e}"),
                },
                Err(e) => log::warn!("Background refresh of {request} failed: {e}"),
            }
        });
        true
    }
}
