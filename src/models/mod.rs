// src/models/mod.rs

//! Domain models for the stats pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod player;
mod stats;

// Re-export all public types
pub use config::{
    ApiConfig, CacheBackend, CacheConfig, Config, LoggingConfig, RescraperConfig, UpstreamConfig,
};
pub use player::{
    BATTLETAG_SEPARATOR, CanonicalLocator, NormalizedTag, Platform, PlayerIdentity, SearchPlayer,
    URL_TAG_SEPARATOR, UnlockData,
};
pub use stats::{
    ALL_HEROES, CareerStats, CompetitiveStatsCollection, CompetitiveSummary, ModeSummary,
    PlayerStats, PlayerStatsProfile, QuickPlayStatsCollection, QuickplaySummary, Rating, StatMap,
    StatValue, StatsCollection, StatsRecord, StatsRequest, TopHeroStats, ViewKind,
};
