// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! | Variable            | Field                     | Unit         |
//! |---------------------|---------------------------|--------------|
//! | `CACHE_ENABLED`     | `cache.enabled`           | bool         |
//! | `CACHE_BACKEND`     | `cache.backend`           | name         |
//! | `CACHE_DIR`         | `cache.dir`               | path         |
//! | `REDIS_URL`         | `cache.url`               | URL          |
//! | `CACHE_TTL`         | `cache.ttl_secs`          | seconds      |
//! | `API_TIMEOUT`       | `api.timeout_ms`          | milliseconds |
//! | `SCRAPER_INTERVAL`  | `rescraper.interval_secs` | seconds      |
//! | `UPSTREAM_BASE_URL` | `upstream.base_url`       | URL          |
//! | `LOG_LEVEL`         | `logging.level`           | filter       |

use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file and apply environment overrides.
///
/// A missing or unreadable file falls back to defaults; a malformed
/// environment override is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load_or_default(path)
    } else {
        log::debug!("No config file at {}, using defaults", path.display());
        Config::default()
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("CACHE_ENABLED") {
        config.cache.enabled = parse_bool("CACHE_ENABLED", &value)?;
    }
    if let Some(value) = lookup("CACHE_BACKEND") {
        config.cache.backend = value.parse()?;
    }
    if let Some(value) = lookup("CACHE_DIR") {
        config.cache.dir = value;
    }
    if let Some(value) = lookup("REDIS_URL") {
        config.cache.url = value;
    }
    if let Some(value) = lookup("CACHE_TTL") {
        config.cache.ttl_secs = parse_number("CACHE_TTL", &value)?;
    }
    if let Some(value) = lookup("API_TIMEOUT") {
        config.api.timeout_ms = parse_number("API_TIMEOUT", &value)?;
    }
    if let Some(value) = lookup("SCRAPER_INTERVAL") {
        config.rescraper.interval_secs = parse_number("SCRAPER_INTERVAL", &value)?;
    }
    if let Some(value) = lookup("UPSTREAM_BASE_URL") {
        config.upstream.base_url = value.trim_end_matches('/').to_string();
    }
    if let Some(value) = lookup("LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{name}={value:?}: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!("{name}={value:?} is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CacheBackend;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            env(&[
                ("CACHE_TTL", "120"),
                ("API_TIMEOUT", "750"),
                ("SCRAPER_INTERVAL", "30"),
                ("CACHE_ENABLED", "false"),
                ("UPSTREAM_BASE_URL", "http://127.0.0.1:8080/"),
                ("LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.cache.ttl(), Duration::from_secs(120));
        assert_eq!(config.api.deadline(), Duration::from_millis(750));
        assert_eq!(config.rescraper.interval(), Duration::from_secs(30));
        assert!(!config.cache.enabled);
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_redis_overrides() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            env(&[
                ("CACHE_BACKEND", "redis"),
                ("REDIS_URL", "redis://cache.internal:6379/1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.url, "redis://cache.internal:6379/1");
        assert!(config.validate().is_ok());

        let err = apply_overrides(&mut config, env(&[("CACHE_BACKEND", "s3")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_no_overrides_keeps_values() {
        let mut config = Config::default();
        config.cache.ttl_secs = 42;
        apply_overrides(&mut config, env(&[])).unwrap();
        assert_eq!(config.cache.ttl_secs, 42);
        assert_eq!(config.api.timeout_ms, Config::default().api.timeout_ms);
    }

    #[test]
    fn test_malformed_override_is_error() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, env(&[("CACHE_TTL", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = apply_overrides(&mut config, env(&[("CACHE_ENABLED", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("CACHE_ENABLED"));
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [cache]
            backend = "memory"
            namespace = "test"
            "#,
        )
        .unwrap();

        let mut config = Config::load_or_default(&path);
        apply_overrides(&mut config, env(&[])).unwrap();
        assert_eq!(config.cache.namespace, "test");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(config.cache.namespace, "ow");
    }
}
