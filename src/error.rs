// src/error.rs

//! Unified error handling for the stats pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The tag could not be resolved to an existing profile
    #[error("Player not found")]
    NotFound,

    /// The resolved profile has no view for the requested platform
    #[error("Invalid platform: {0}")]
    InvalidPlatform(String),

    /// The live pipeline did not finish before the deadline
    #[error("Request timeout")]
    Timeout,

    /// The live pipeline timed out and no cached value exists yet
    #[error("Request timeout - data will be scraped in background")]
    ScrapePending,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with an unexpected status code
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    /// The unlocks endpoint did not know the requested id
    #[error("Unlock ID {0} not found")]
    UnlockNotFound(String),

    /// A spawned pipeline task panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Cache store unavailable or stored value malformed
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create an upstream status error.
    pub fn upstream_status(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::UpstreamStatus {
            url: url.into(),
            status: status.as_u16(),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl fmt::Display) -> Self {
        Self::Cache(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error came from talking to the upstream site.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::UpstreamStatus { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
