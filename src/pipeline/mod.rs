//! Pipeline entry points built on top of the stats service.
//!
//! - `FreshnessGateway`: deadline-bounded live scrape with cache fallback
//! - `Rescraper`: periodic refresh of every cached record

pub mod gateway;
pub mod rescrape;

pub use gateway::{Fetched, FreshnessGateway, Source};
pub use rescrape::{RescrapeReport, Rescraper};
