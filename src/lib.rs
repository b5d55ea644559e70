// src/lib.rs

//! owstats: Overwatch career profile scraper.
//!
//! Resolves a BattleTag to its public career page, extracts typed stats and
//! serves them through a deadline-bounded gateway backed by a TTL cache.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
