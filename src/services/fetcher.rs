// src/services/fetcher.rs

//! Upstream document fetcher.
//!
//! Owns the HTTP clients used to talk to the profile site. Every body is read
//! to the end before the response is dropped so pooled connections stay
//! reusable.

use reqwest::header::{ACCEPT, HeaderName, REFERER};
use reqwest::{Client, Response, StatusCode};

use crate::error::{AppError, Result};
use crate::models::{CanonicalLocator, SearchPlayer, UnlockData, UpstreamConfig};
use crate::utils::encode_segment;
use crate::utils::http::{create_probe_client, create_session_client, drain};

/// HTTP access to career pages, the search API and the unlocks API.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    config: UpstreamConfig,
    session: Client,
    probe: Client,
}

impl DocumentFetcher {
    /// Build both clients from the upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            session: create_session_client(config)?,
            probe: create_probe_client(config)?,
        })
    }

    /// Absolute URL of a path below the configured locale.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.locale,
            path.trim_start_matches('/')
        )
    }

    /// Career page URL for a tag or resolved locator.
    pub fn career_url(&self, id: &str) -> String {
        self.url(&format!("career/{}", encode_segment(id)))
    }

    fn search_page_url(&self) -> String {
        self.url("search/")
    }

    /// Issue one request without following redirects.
    pub async fn probe(&self, url: &str) -> Result<Response> {
        log::debug!("Probing {url}");
        Ok(self.probe.get(url).send().await?)
    }

    /// Visit the search page so the session carries the cookies the API wants.
    pub async fn prime(&self) -> Result<()> {
        let url = self.search_page_url();
        let response = self.session.get(&url).send().await?;
        let status = response.status();
        drain(response).await;

        log::debug!("Session priming returned {status}");
        if status != StatusCode::OK {
            return Err(AppError::upstream_status(url, status));
        }
        Ok(())
    }

    /// Fetch the career page body of a resolved locator.
    pub async fn fetch_profile(&self, locator: &CanonicalLocator) -> Result<String> {
        self.prime().await?;

        let url = format!("{}/", self.career_url(locator.as_str()));
        log::debug!("Fetching profile {url}");

        let response = self.session.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            drain(response).await;
            return Err(AppError::NotFound);
        }
        if !status.is_success() {
            drain(response).await;
            return Err(AppError::upstream_status(url, status));
        }

        Ok(response.text().await?)
    }

    /// Query the name-search endpoint.
    pub async fn search(&self, tag: &str) -> Result<Vec<SearchPlayer>> {
        let url = self.url(&format!("search/account-by-name/{}", encode_segment(tag)));
        log::debug!("Searching {url}");

        let response = self.session.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            drain(response).await;
            return Err(AppError::upstream_status(url, status));
        }

        Ok(response.json().await?)
    }

    /// Look up one cosmetic unlock by id.
    pub async fn unlock(&self, unlock_id: &str) -> Result<UnlockData> {
        self.prime().await?;

        let url = url::Url::parse_with_params(
            &self.url("search/unlocks/"),
            &[("unlockIds", unlock_id)],
        )?;

        let response = self
            .session
            .get(url.as_str())
            .header(ACCEPT, "*/*")
            .header(REFERER, self.search_page_url())
            .header(HeaderName::from_static("x-requested-with"), "XMLHttpRequest")
            .header(HeaderName::from_static("sec-fetch-dest"), "empty")
            .header(HeaderName::from_static("sec-fetch-mode"), "cors")
            .header(HeaderName::from_static("sec-fetch-site"), "same-origin")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            drain(response).await;
            return Err(AppError::upstream_status(url.as_str(), status));
        }

        let unlocks: Vec<UnlockData> = response.json().await?;
        unlocks
            .into_iter()
            .find(|u| u.id == unlock_id)
            .ok_or_else(|| AppError::UnlockNotFound(unlock_id.to_string()))
    }
}
