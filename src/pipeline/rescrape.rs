// src/pipeline/rescrape.rs

//! Periodic refresh of every cached record.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};
use crate::models::RescraperConfig;
use crate::services::StatsSource;
use crate::storage::StatsCache;

/// Summary of one pass over the cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RescrapeReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Keys whose player or platform no longer resolves
    pub skipped: usize,
}

/// Replays the live pipeline for every cached key.
pub struct Rescraper {
    source: Arc<dyn StatsSource>,
    cache: StatsCache,
    delay: Duration,
}

impl Rescraper {
    pub fn new(source: Arc<dyn StatsSource>, cache: StatsCache, config: &RescraperConfig) -> Self {
        Self {
            source,
            cache,
            delay: config.delay(),
        }
    }

    /// Refresh every cached entry once, pausing between upstream calls.
    pub async fn scrape_all(&self) -> Result<RescrapeReport> {
        let keys = self.cache.cached_keys().await?;
        let mut report = RescrapeReport {
            total: keys.len(),
            ..RescrapeReport::default()
        };
        log::info!("Rescraping {} cached entries", report.total);

        for (i, key) in keys.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let request = key.request();
            match self.source.fetch(&request).await {
                Ok(record) => match self.cache.put(&request, &record).await {
                    Ok(()) => report.successful += 1,
                    Err(e) => {
                        report.failed += 1;
                        log::warn!("Storing rescraped {request} failed: {e}");
                    }
                },
                Err(e @ (AppError::NotFound | AppError::InvalidPlatform(_))) => {
                    report.skipped += 1;
                    log::info!("Skipping {request}: {e}");
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("Rescraping {request} failed: {e}");
                }
            }
        }

        log::info!(
            "Rescrape finished: {} ok, {} failed, {} skipped",
            report.successful,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    /// Rescrape on every interval tick until Ctrl-C.
    pub async fn run(&self, interval: Duration) -> Result<()> {
        self.run_until(interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Listening for Ctrl-C failed: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Rescrape on every interval tick until `shutdown` completes.
    pub async fn run_until<F>(&self, interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.scrape_all() => {
                    if let Err(e) = result {
                        log::warn!("Rescrape pass failed: {e}");
                    }
                }
            }
        }

        log::info!("Rescraper stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerStats, StatsRecord, StatsRequest};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsSource for FakeSource {
        async fn fetch(&self, request: &StatsRequest) -> Result<StatsRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.tag.as_str() {
                "Gone-1" => Err(AppError::NotFound),
                "Broken-1" => Err(AppError::upstream_status(
                    "https://example.com",
                    reqwest::StatusCode::BAD_GATEWAY,
                )),
                tag => Ok(StatsRecord::Full(PlayerStats {
                    name: format!("fresh {tag}"),
                    ..PlayerStats::default()
                })),
            }
        }
    }

    fn stale() -> StatsRecord {
        StatsRecord::Full(PlayerStats {
            name: "stale".into(),
            ..PlayerStats::default()
        })
    }

    async fn seeded_cache(tags: &[&str]) -> StatsCache {
        let cache = StatsCache::new(Arc::new(MemoryStore::new()), "ow", Duration::from_secs(60));
        for tag in tags {
            cache
                .put(&StatsRequest::full("pc", *tag), &stale())
                .await
                .unwrap();
        }
        cache
    }

    fn config() -> RescraperConfig {
        RescraperConfig {
            interval_secs: 1,
            delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_scrape_all_refreshes_entries() {
        let cache = seeded_cache(&["Player-1234", "Gone-1", "Broken-1"]).await;
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let rescraper = Rescraper::new(source.clone(), cache.clone(), &config());

        let report = rescraper.scrape_all().await.unwrap();
        assert_eq!(
            report,
            RescrapeReport {
                total: 3,
                successful: 1,
                failed: 1,
                skipped: 1,
            }
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        let refreshed = cache
            .get(&StatsRequest::full("pc", "Player-1234"))
            .await
            .unwrap()
            .unwrap()
            .into_full()
            .unwrap();
        assert_eq!(refreshed.name, "fresh Player-1234");
        assert_eq!(
            cache.get(&StatsRequest::full("pc", "Gone-1")).await.unwrap(),
            Some(stale())
        );
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = seeded_cache(&[]).await;
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let report = Rescraper::new(source, cache, &config())
            .scrape_all()
            .await
            .unwrap();
        assert_eq!(report, RescrapeReport::default());
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let cache = seeded_cache(&["Player-1234"]).await;
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let rescraper = Rescraper::new(source.clone(), cache, &config());

        rescraper
            .run_until(
                Duration::from_millis(20),
                tokio::time::sleep(Duration::from_millis(70)),
            )
            .await
            .unwrap();

        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }
}
