// src/services/stats.rs

//! The live stats pipeline.
//!
//! Resolves an identity, fetches its career page, extracts it and builds the
//! requested record. Private profiles short-circuit before any page fetch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Config, PlayerIdentity, PlayerStats, PlayerStatsProfile, StatsRecord, StatsRequest,
    UnlockData, ViewKind,
};
use crate::services::aggregator::{self, Namecard};
use crate::services::extractor::{self, GeneralInfo, ProfileDocument};
use crate::services::fetcher::DocumentFetcher;
use crate::services::resolver::IdentityResolver;

/// Anything able to produce a stats record for a request.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self, request: &StatsRequest) -> Result<StatsRecord>;
}

/// Live scraping implementation of [`StatsSource`].
pub struct StatsService {
    fetcher: Arc<DocumentFetcher>,
    resolver: IdentityResolver,
}

impl StatsService {
    /// Build the service and its HTTP clients from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(DocumentFetcher::new(&config.upstream)?);
        Ok(Self::with_fetcher(fetcher, config.upstream.max_redirect_hops))
    }

    pub fn with_fetcher(fetcher: Arc<DocumentFetcher>, max_redirect_hops: usize) -> Self {
        let resolver = IdentityResolver::new(Arc::clone(&fetcher), max_redirect_hops);
        Self { fetcher, resolver }
    }

    /// Full stats of a player.
    pub async fn resolve_full(&self, platform: &str, tag: &str) -> Result<PlayerStats> {
        let (identity, locator) = self.resolver.resolve(platform, tag).await?;
        if !identity.public {
            log::info!("Profile {tag} is private");
            return Ok(PlayerStats::private());
        }

        let body = self.fetcher.fetch_profile(&locator).await?;
        let profile = {
            let doc = ProfileDocument::parse(&body)?;
            extractor::extract_full(&doc, identity.platform)?
        };

        let namecard = self.namecard(&profile.info, &identity).await;
        Ok(aggregator::build_full(profile, namecard))
    }

    /// Summary stats of a player.
    pub async fn resolve_summary(&self, platform: &str, tag: &str) -> Result<PlayerStatsProfile> {
        let (identity, locator) = self.resolver.resolve(platform, tag).await?;
        if !identity.public {
            log::info!("Profile {tag} is private");
            return Ok(PlayerStatsProfile::private());
        }

        let body = self.fetcher.fetch_profile(&locator).await?;
        let summary = {
            let doc = ProfileDocument::parse(&body)?;
            extractor::extract_summary(&doc, identity.platform)?
        };

        let namecard = self.namecard(&summary.info, &identity).await;
        Ok(aggregator::build_summary(summary, namecard))
    }

    async fn namecard(&self, info: &GeneralInfo, identity: &PlayerIdentity) -> Namecard {
        let unlock = match &info.namecard_id {
            Some(id) => self.lookup_unlock(id).await,
            None => None,
        };
        Namecard::resolve(info, identity, unlock)
    }

    async fn lookup_unlock(&self, id: &str) -> Option<UnlockData> {
        match self.fetcher.unlock(id).await {
            Ok(unlock) => Some(unlock),
            Err(e) => {
                log::warn!("Namecard lookup for {id} failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl StatsSource for StatsService {
    async fn fetch(&self, request: &StatsRequest) -> Result<StatsRecord> {
        match request.view {
            ViewKind::Full => self
                .resolve_full(&request.platform, &request.tag)
                .await
                .map(StatsRecord::Full),
            ViewKind::Summary => self
                .resolve_summary(&request.platform, &request.tag)
                .await
                .map(StatsRecord::Summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::UpstreamConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = include_str!("../../tests/fixtures/profile.html");

    fn service_for(server: &MockServer) -> StatsService {
        let config = UpstreamConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..UpstreamConfig::default()
        };
        StatsService::with_fetcher(Arc::new(DocumentFetcher::new(&config).unwrap()), 5)
    }

    async fn mount_identity(server: &MockServer, public: bool) {
        Mock::given(method("GET"))
            .and(path("/en-us/career/Player-1234"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/en-us/career/Player-1234%7Cabcdef/"),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/en-us/search/account-by-name/Player%231234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"battleTag": "Player#1234", "isPublic": public, "namecard": "0xsearch"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/en-us/search/account-by-name/Player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/en-us/search/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    async fn mount_profile(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/en-us/career/Player-1234%7Cabcdef/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_full_end_to_end() {
        let server = MockServer::start().await;
        mount_identity(&server, true).await;
        mount_profile(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/en-us/search/unlocks/"))
            .and(query_param("unlockIds", "0x0250000000001234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "0x0250000000001234", "name": "Card", "icon": "https://cdn/card.png"}
            ])))
            .mount(&server)
            .await;

        let stats = service_for(&server)
            .resolve_full("pc", "Player-1234")
            .await
            .unwrap();

        assert_eq!(stats.name, "Player");
        assert_eq!(stats.namecard_id, "0x0250000000001234");
        assert_eq!(stats.namecard_title, "Card");
        assert_eq!(stats.namecard_image, "https://cdn/card.png");
        assert_eq!(stats.games_played, 1284);
        assert!(!stats.private);
    }

    #[tokio::test]
    async fn test_failed_unlock_keeps_search_namecard() {
        let server = MockServer::start().await;
        mount_identity(&server, true).await;
        mount_profile(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/en-us/search/unlocks/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let profile = service_for(&server)
            .resolve_summary("pc", "Player-1234")
            .await
            .unwrap();

        assert_eq!(profile.namecard_id, "0x0250000000001234");
        assert_eq!(profile.namecard_title, "");
        assert_eq!(profile.namecard_image, "0xsearch");
        assert_eq!(profile.competitive_stats.mode.games_played, 50);
    }

    #[tokio::test]
    async fn test_private_profile_skips_page_fetch() {
        let server = MockServer::start().await;
        mount_identity(&server, false).await;
        mount_profile(&server, 0).await;

        let record = service_for(&server)
            .fetch(&StatsRequest::full("pc", "Player-1234"))
            .await
            .unwrap();

        assert!(record.is_private());
        assert_eq!(record, StatsRecord::Full(PlayerStats::private()));
    }

    #[tokio::test]
    async fn test_missing_platform_view() {
        let server = MockServer::start().await;
        mount_identity(&server, true).await;
        mount_profile(&server, 1).await;

        let result = service_for(&server)
            .fetch(&StatsRequest::summary("console", "Player-1234"))
            .await;

        assert!(matches!(result, Err(AppError::InvalidPlatform(p)) if p == "console"));
    }
}
