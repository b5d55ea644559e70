//! Service layer for the stats pipeline.
//!
//! This module contains the business logic for:
//! - Upstream access (`DocumentFetcher`)
//! - Identity resolution (`IdentityResolver`)
//! - Page extraction (`extractor`)
//! - Record assembly (`aggregator`)
//! - The composed live pipeline (`StatsService`)

pub mod aggregator;
pub mod extractor;
pub mod fetcher;
pub mod resolver;
mod stats;

pub use fetcher::DocumentFetcher;
pub use resolver::IdentityResolver;
pub use stats::{StatsService, StatsSource};
