// src/services/resolver.rs

//! Player identity resolution.
//!
//! A tag is confirmed to exist by following the career redirect chain until
//! it lands on a locator carrying the `|` separator. The search API is only
//! consulted afterwards for metadata, because it is ambiguous for tags that
//! share a name.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::LOCATION;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CanonicalLocator, NormalizedTag, Platform, PlayerIdentity, SearchPlayer};
use crate::services::fetcher::DocumentFetcher;
use crate::utils::http::drain;
use crate::utils::{decode_path, resolve_url};

/// Marker separating the display tag from the account id in career paths.
const LOCATOR_MARKER: char = '|';

/// Resolves (platform, tag) into a confirmed identity and career locator.
pub struct IdentityResolver {
    fetcher: Arc<DocumentFetcher>,
    max_hops: usize,
}

impl IdentityResolver {
    pub fn new(fetcher: Arc<DocumentFetcher>, max_hops: usize) -> Self {
        Self {
            fetcher,
            max_hops: max_hops.max(1),
        }
    }

    /// Resolve a tag, proving existence before looking at the platform.
    pub async fn resolve(
        &self,
        platform: &str,
        tag: &str,
    ) -> Result<(PlayerIdentity, CanonicalLocator)> {
        let normalized = NormalizedTag::parse(tag);
        let locator = self.probe_locator(&normalized).await?;
        log::debug!("Resolved {tag} to career locator {locator}");

        let platform: Platform = platform.parse()?;

        let (by_name, by_full_tag) = futures::join!(
            self.search_or_empty(&normalized.name),
            self.search_or_empty(&normalized.full_tag)
        );

        let found = disambiguate(by_name, by_full_tag);
        if found.is_none() {
            log::info!("Search could not identify {tag}, using defaults");
        }

        let identity = PlayerIdentity::from_search(platform, tag, &normalized, found);
        Ok((identity, locator))
    }

    /// Follow the career redirect chain until it reveals the locator.
    pub async fn probe_locator(&self, tag: &NormalizedTag) -> Result<CanonicalLocator> {
        let mut url = self.fetcher.career_url(&tag.url_form());

        for hop in 0..self.max_hops {
            let response = self.fetcher.probe(&url).await?;
            let status = response.status();
            log::debug!("Redirect hop {hop}: {status} for {url}");

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                drain(response).await;

                let Some(location) = location else {
                    log::debug!("Redirect without location for {url}");
                    return Err(AppError::NotFound);
                };

                let decoded = decode_path(&location);
                if decoded.contains(LOCATOR_MARKER) {
                    return Ok(locator_from_path(&decoded));
                }

                url = resolve_url(&Url::parse(&url)?, &location);
                continue;
            }

            if status == StatusCode::OK {
                let decoded = decode_path(response.url().path());
                drain(response).await;
                if decoded.contains(LOCATOR_MARKER) {
                    return Ok(locator_from_path(&decoded));
                }
            } else {
                drain(response).await;
            }
            break;
        }

        log::debug!("No career locator found for {}", tag.full_tag);
        Err(AppError::NotFound)
    }

    async fn search_or_empty(&self, tag: &str) -> Vec<SearchPlayer> {
        match self.fetcher.search(tag).await {
            Ok(players) => players,
            Err(e) => {
                log::warn!("Search for {tag} failed: {e}");
                Vec::new()
            }
        }
    }
}

/// Pick the search record describing the requested player, if any.
///
/// A full-tag hit wins; otherwise a name search is trusted only when it is
/// unambiguous.
pub fn disambiguate(
    mut by_name: Vec<SearchPlayer>,
    mut by_full_tag: Vec<SearchPlayer>,
) -> Option<SearchPlayer> {
    if !by_full_tag.is_empty() {
        return Some(by_full_tag.swap_remove(0));
    }
    if by_name.len() == 1 {
        return by_name.pop();
    }
    None
}

/// The path fragment after `/career/`, without surrounding slashes.
fn locator_from_path(path: &str) -> CanonicalLocator {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let fragment = match path.find("/career/") {
        Some(idx) => &path[idx + "/career/".len()..],
        None => path,
    };
    CanonicalLocator::new(fragment.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpstreamConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn player(tag: &str, public: bool) -> SearchPlayer {
        SearchPlayer {
            battle_tag: tag.into(),
            is_public: public,
            ..SearchPlayer::default()
        }
    }

    fn resolver_for(server: &MockServer) -> IdentityResolver {
        let config = UpstreamConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..UpstreamConfig::default()
        };
        IdentityResolver::new(Arc::new(DocumentFetcher::new(&config).unwrap()), 5)
    }

    async fn mount_redirect(server: &MockServer, from: &str, to: &str) {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", to))
            .mount(server)
            .await;
    }

    async fn mount_search(server: &MockServer, tag_path: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/en-us/search/account-by-name/{tag_path}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_disambiguate_full_tag_beats_single_name_hit() {
        let found = disambiguate(
            vec![player("Player#9999", true)],
            vec![player("Player#1234", false)],
        );
        assert_eq!(found.unwrap().battle_tag, "Player#1234");
    }

    #[test]
    fn test_disambiguate_single_name_hit() {
        let found = disambiguate(vec![player("Player#1234", true)], vec![]);
        assert_eq!(found.unwrap().battle_tag, "Player#1234");
    }

    #[test]
    fn test_disambiguate_ambiguous_name_hits() {
        let found = disambiguate(
            vec![player("Player#1", true), player("Player#2", true)],
            vec![],
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_locator_from_path() {
        assert_eq!(
            locator_from_path("/en-us/career/Player-1234|abcdef/").as_str(),
            "Player-1234|abcdef"
        );
        assert_eq!(
            locator_from_path("https://host/career/Player-1234|abcdef/?x=1").as_str(),
            "Player-1234|abcdef"
        );
    }

    #[tokio::test]
    async fn test_resolve_follows_redirects_and_searches() {
        let server = MockServer::start().await;
        mount_redirect(&server, "/en-us/career/Player-1234", "/en-us/career/player-1234/").await;
        mount_redirect(
            &server,
            "/en-us/career/player-1234/",
            "/en-us/career/Player-1234%7Cabcdef/",
        )
        .await;
        mount_search(
            &server,
            "Player",
            json!([{"battleTag": "Player#1", "isPublic": true}, {"battleTag": "Player#2", "isPublic": true}]),
        )
        .await;
        mount_search(
            &server,
            "Player%231234",
            json!([{"battleTag": "Player#1234", "isPublic": false, "namecard": "0x99"}]),
        )
        .await;

        let (identity, locator) = resolver_for(&server)
            .resolve("pc", "Player-1234")
            .await
            .unwrap();

        assert_eq!(locator.as_str(), "Player-1234|abcdef");
        assert_eq!(identity.platform, Platform::Pc);
        assert_eq!(identity.full_tag, "Player#1234");
        assert_eq!(identity.name, "Player");
        assert!(!identity.public);
        assert_eq!(identity.namecard.as_deref(), Some("0x99"));
    }

    #[tokio::test]
    async fn test_resolve_search_failure_falls_back_to_defaults() {
        let server = MockServer::start().await;
        mount_redirect(
            &server,
            "/en-us/career/Player-1234",
            "/en-us/career/Player-1234%7Cabcdef/",
        )
        .await;

        let (identity, _) = resolver_for(&server)
            .resolve("console", "Player-1234")
            .await
            .unwrap();

        assert!(identity.public);
        assert_eq!(identity.full_tag, "Player#1234");
        assert_eq!(identity.platform, Platform::Console);
    }

    #[tokio::test]
    async fn test_resolve_unknown_tag_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en-us/career/Nobody-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = resolver_for(&server).resolve("pc", "Nobody-1").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en-us/career/Player-1234"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let result = resolver_for(&server).resolve("pc", "Player-1234").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_redirect_loop_exhausts_hops() {
        let server = MockServer::start().await;
        mount_redirect(&server, "/en-us/career/Loop-1", "/en-us/career/Loop-1").await;

        let result = resolver_for(&server).resolve("pc", "Loop-1").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_invalid_platform_after_existence() {
        let server = MockServer::start().await;
        mount_redirect(
            &server,
            "/en-us/career/Player-1234",
            "/en-us/career/Player-1234%7Cabcdef/",
        )
        .await;

        let result = resolver_for(&server).resolve("xbox", "Player-1234").await;
        assert!(matches!(result, Err(AppError::InvalidPlatform(p)) if p == "xbox"));
    }
}
