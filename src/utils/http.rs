// src/utils/http.rs

//! HTTP client utilities.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;

use crate::error::Result;
use crate::models::UpstreamConfig;

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Create the session client used for profile, search and unlock requests.
///
/// Cookies set by the priming request are replayed on later calls.
pub fn create_session_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .default_headers(default_headers())
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Create a client that reports redirects instead of following them.
pub fn create_probe_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .default_headers(default_headers())
        .cookie_store(true)
        .redirect(Policy::none())
        .build()?;
    Ok(client)
}

/// Read a response body to the end and discard it.
pub async fn drain(response: reqwest::Response) {
    if let Err(e) = response.bytes().await {
        log::debug!("Discarding response body failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build_from_default_config() {
        let config = UpstreamConfig::default();
        assert!(create_session_client(&config).is_ok());
        assert!(create_probe_client(&config).is_ok());
    }
}
