//! owstats CLI
//!
//! Local entry point for looking up players and keeping the cache fresh.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use owstats::{
    config::load_config,
    error::{AppError, Result},
    models::{Config, StatsRequest},
    pipeline::{FreshnessGateway, Rescraper},
    services::{StatsService, StatsSource},
    storage::StatsCache,
};

/// owstats - Overwatch career profile scraper
#[derive(Parser, Debug)]
#[command(name = "owstats", version, about = "Overwatch career profile stats")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the stats of one player
    Stats {
        /// Platform: pc or console
        platform: String,

        /// BattleTag, either `Name#1234` or `Name-1234`
        tag: String,

        /// Return the condensed summary instead of full stats
        #[arg(long)]
        summary: bool,

        /// Bypass the cache and the deadline
        #[arg(long)]
        live: bool,
    },

    /// Refresh every cached player periodically
    Rescrape {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },

    /// Inspect or edit the cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Validate configuration
    Validate,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// List cached entries
    List,

    /// Drop the cached entry of one player
    Remove {
        platform: String,
        tag: String,

        #[arg(long)]
        summary: bool,
    },
}

/// Initialize logging from the configured level, or debug when verbose.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn request_for(platform: String, tag: String, summary: bool) -> StatsRequest {
    if summary {
        StatsRequest::summary(platform, tag)
    } else {
        StatsRequest::full(platform, tag)
    }
}

fn require_cache(config: &Config) -> Result<StatsCache> {
    StatsCache::from_config(&config.cache)?
        .ok_or_else(|| AppError::config("cache is disabled (cache.enabled = false)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config, cli.verbose);

    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Stats {
            platform,
            tag,
            summary,
            live,
        } => {
            let request = request_for(platform, tag, summary);
            let service: Arc<dyn StatsSource> = Arc::new(StatsService::new(&config)?);

            if live {
                let record = service.fetch(&request).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
                eprintln!("source: live");
                return Ok(());
            }

            let cache = StatsCache::from_config(&config.cache)?;
            let gateway = FreshnessGateway::from_config(service, cache, &config.api);
            let outcome = gateway.get_with_fallback(&request).await;

            if gateway.refreshes_in_flight() > 0 {
                log::info!("Waiting for the background refresh of {request}");
            }
            gateway.wait_for_refreshes().await;

            let fetched = outcome?;
            log::debug!("Served {request}");
            println!("{}", serde_json::to_string_pretty(&fetched.record)?);
            eprintln!("source: {}", fetched.source);
        }

        Command::Rescrape { once } => {
            let cache = require_cache(&config)?;
            let service: Arc<dyn StatsSource> = Arc::new(StatsService::new(&config)?);
            let rescraper = Rescraper::new(service, cache, &config.rescraper);

            if once {
                let report = rescraper.scrape_all().await?;
                log::info!(
                    "Rescraped {} entries: {} ok, {} failed, {} skipped",
                    report.total,
                    report.successful,
                    report.failed,
                    report.skipped
                );
            } else {
                log::info!(
                    "Rescraping every {}s, press Ctrl-C to stop",
                    config.rescraper.interval_secs
                );
                rescraper.run(config.rescraper.interval()).await?;
            }
        }

        Command::Cache { command } => {
            let cache = require_cache(&config)?;
            match command {
                CacheCommand::List => {
                    let mut keys = cache.cached_keys().await?;
                    keys.sort_by_key(|key| key.to_string());
                    for key in &keys {
                        println!("{key}");
                    }
                    log::info!("{} cached entries", keys.len());
                }
                CacheCommand::Remove {
                    platform,
                    tag,
                    summary,
                } => {
                    let request = request_for(platform, tag, summary);
                    cache.remove(&request).await?;
                    log::info!("Removed {request} from cache");
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
