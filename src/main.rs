//! # scrapl
//!
//! Scrapes the Fantasy Premier League API and a bookmaker odds API and writes
//! the results as dated JSON files.
//!
//! ## Usage
//!
//! ```sh
//! scrapl -j ./json fpl --all
//! ODDS_API_KEY=... scrapl -j ./json odds --date 240816
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: optional YAML file, overlaid with CLI flags and env
//! 2. **Fetching**: one `reqwest` client behind a fixed-delay retry wrapper
//! 3. **Extraction**: FPL extractors merged into one store, or odds matches
//!    reduced to margin-free probabilities
//! 4. **Output**: `{json_output_dir}/{date}/{name}.json`

use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod odds;
mod orchestrator;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command, FplArgs, OddsArgs};
use config::{FailurePolicy, ScraplConfig};
use error::{Result, ScrapeError};
use fetch::{FetchJson, build_fetcher};
use odds::scraper::{BetScraper, OddsWindow};
use orchestrator::FplScraper;
use outputs::json;
use scrapers::ExtractorKind;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("scrapl starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, ?args.command, "Parsed CLI arguments");

    let mut config = ScraplConfig::load(args.config.as_deref())?;
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if args.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let fetcher = build_fetcher(&config)?;

    let outcome = match args.command {
        Command::Fpl(fpl) => run_fpl(fetcher, &config, &fpl, &args.json_output_dir).await,
        Command::Odds(odds) => run_odds(fetcher, &config, &odds, &args.json_output_dir).await,
    };
    if let Err(e) = outcome {
        if e.is_config() {
            error!(error = %e, "Configuration error; fix the flags or config file");
        } else {
            error!(error = %e, "Scrape failed");
        }
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_fpl<F: FetchJson>(
    fetcher: F,
    config: &ScraplConfig,
    args: &FplArgs,
    json_output_dir: &str,
) -> Result<()> {
    // Command-line selection wins; the config list is the fallback.
    let mut scraper = if args.is_empty() {
        FplScraper::with_specs(fetcher, config, config.extractors.iter().copied())?
    } else {
        FplScraper::new(fetcher, config)?
    };

    if args.all {
        if args.players.is_empty() {
            scraper.init_all().await?;
        } else {
            scraper.init_with_players(Some(args.players.as_slice())).await?;
        }
    } else {
        if args.general {
            scraper.register(ExtractorKind::General, None)?;
        }
        for &id in &args.players {
            scraper.register(ExtractorKind::Player, Some(id))?;
        }
        if args.fixtures {
            scraper.register(ExtractorKind::Fixtures, None)?;
        }
    }
    for &gw in &args.gameweeks {
        scraper.register(ExtractorKind::Gameweek, Some(gw))?;
    }

    if scraper.is_empty() {
        warn!("Nothing to scrape: pass --all, --general, --fixtures, --gameweek or --player, or list extractors in the config file");
        return Err(ScrapeError::NoExtractors);
    }
    info!(
        count = scraper.len(),
        extractors = %scraper.extractors().map(|(e, _)| e).join(", "),
        "Extractors registered"
    );

    let store = scraper.scrape_all().await?;
    for st in store.scraper_types() {
        for sub in store.sub_types(st) {
            let records = store.records(st, sub).map_or(0, <[_]>::len);
            info!(scraper_type = st, sub_type = sub, records, "Table collected");
        }
    }
    for failure in scraper.failures() {
        warn!(extractor = %failure.extractor, error = %failure.error, "Extractor failed");
    }
    if scraper.store().is_empty() {
        warn!("Every extractor failed; writing an empty store");
    }
    info!(
        records = scraper.store().record_count(),
        failed = scraper.failures().len(),
        "FPL scrape finished"
    );

    json::write_json(scraper.store(), json_output_dir, "fpl").await?;
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_odds<F: FetchJson>(
    fetcher: F,
    config: &ScraplConfig,
    args: &OddsArgs,
    json_output_dir: &str,
) -> Result<()> {
    let (window, name) = match args.date.as_deref() {
        Some(date) => (OddsWindow::historical(date)?, format!("odds_{date}")),
        None => (OddsWindow::Upcoming, "odds".to_string()),
    };

    let mut scraper = BetScraper::new(fetcher, config, window)?;
    scraper.run_scrape().await?;
    let rows = scraper.to_rows()?;
    info!(games = scraper.games().len(), rows = rows.len(), "Odds scrape finished");

    json::write_json(&rows, json_output_dir, &name).await?;
    Ok(())
}
