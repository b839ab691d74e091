//! Run configuration.
//!
//! A single [`ScraplConfig`] is built at start-up from an optional YAML file,
//! then overlaid with command-line and environment values by `main`. It is
//! handed by reference to the fetcher, the FPL orchestrator and the odds
//! scraper; nothing reads the environment after start-up.
//!
//! # Example file
//!
//! ```yaml
//! sport: soccer_epl
//! regions: uk
//! markets: h2h
//! season: 24
//! failure_policy: continue
//! extractors:
//!   - kind: general
//!   - kind: gameweek
//!     index: 1
//! retry:
//!   max_attempts: 3
//!   delay_ms: 500
//! ```

use crate::error::{Result, ScrapeError};
use crate::scrapers::ExtractorSpec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_FPL_BASE_URL: &str = "https://fantasy.premierleague.com/api/";
pub const DEFAULT_ODDS_BASE_URL: &str = "https://api.the-odds-api.com/v4/sports/";

/// What the orchestrator does when one extractor fails mid-batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and return the error. Already merged results are kept.
    #[default]
    Abort,
    /// Record the failure and move on to the next extractor.
    Continue,
}

/// Retry budget for a single fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Fixed pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraplConfig {
    /// Root of the Fantasy Premier League API.
    pub fpl_base_url: String,
    /// Root of the odds API, up to and including `/sports/`.
    pub odds_base_url: String,
    /// Odds API sport key.
    pub sport: String,
    /// Odds API bookmaker region.
    pub regions: String,
    /// Odds API market type.
    pub markets: String,
    /// Season label stamped on exported odds rows.
    pub season: u32,
    /// Odds API key. Usually supplied through `ODDS_API_KEY` rather than the file.
    pub api_key: Option<String>,
    pub retry: RetryConfig,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// FPL extractors to run when none are given on the command line.
    pub extractors: Vec<ExtractorSpec>,
}

impl Default for ScraplConfig {
    fn default() -> Self {
        Self {
            fpl_base_url: DEFAULT_FPL_BASE_URL.to_string(),
            odds_base_url: DEFAULT_ODDS_BASE_URL.to_string(),
            sport: "soccer_epl".to_string(),
            regions: "uk".to_string(),
            markets: "h2h".to_string(),
            season: 24,
            api_key: None,
            retry: RetryConfig::default(),
            request_timeout_secs: 30,
            failure_policy: FailurePolicy::Abort,
            extractors: Vec::new(),
        }
    }
}

impl ScraplConfig {
    /// Load configuration from `path`, or fall back to defaults when no path
    /// is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(Path::new(path))
            .map_err(|e| ScrapeError::ConfigFile(format!("{path}: {e}")))?;
        let config = Self::from_yaml_str(&text)?;
        info!(path, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ScrapeError::ConfigFile(e.to_string()))
    }

    /// The odds API key, or a configuration error when none was supplied.
    pub fn odds_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ScrapeError::MissingCredential("ODDS_API_KEY")),
        }
    }

    pub fn fpl_base(&self) -> Result<Url> {
        base_url(&self.fpl_base_url)
    }

    pub fn odds_base(&self) -> Result<Url> {
        base_url(&self.odds_base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse a base URL, making sure relative joins append rather than replace
/// the last path segment.
fn base_url(raw: &str) -> Result<Url> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}
