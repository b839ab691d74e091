//! Fetches matches from the odds API and flattens them into per-match rows.
//!
//! # Endpoints
//!
//! | Window | Path | Extra query |
//! |--------|------|-------------|
//! | Upcoming | `{sport}/odds/` | |
//! | Historical | `{sport}/odds-history/` | `date=20YY-MM-DDT12:00:00Z` |
//!
//! Both take `apiKey`, `regions` and `markets`. Historical responses wrap the
//! match list as `{ "timestamp": ..., "data": [...] }`; it is unwrapped before
//! parsing.

use super::OddsEvent;
use super::game::Game;
use crate::config::ScraplConfig;
use crate::error::{Result, ScrapeError};
use crate::fetch::FetchJson;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{info, instrument, warn};
use url::Url;

/// Which slice of the odds API to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OddsWindow {
    Upcoming,
    /// Snapshot at noon UTC on the given date.
    Historical { date: NaiveDate },
}

impl OddsWindow {
    /// Parse a `YYMMDD` date, e.g. `"240816"`.
    pub fn historical(yymmdd: &str) -> Result<Self> {
        if yymmdd.len() != 6 || !yymmdd.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ScrapeError::InvalidDate(format!(
                "`{yymmdd}` is not a YYMMDD date"
            )));
        }
        let date = NaiveDate::parse_from_str(&format!("20{yymmdd}"), "%Y%m%d")
            .map_err(|e| ScrapeError::InvalidDate(format!("`{yymmdd}`: {e}")))?;
        Ok(Self::Historical { date })
    }

    fn path(&self, sport: &str) -> String {
        match self {
            Self::Upcoming => format!("{sport}/odds/"),
            Self::Historical { .. } => format!("{sport}/odds-history/"),
        }
    }
}

/// One exported row: a match and its aggregated probabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOddsRow {
    pub home: String,
    pub away: String,
    pub date: String,
    pub home_odds: f64,
    pub away_odds: f64,
    pub draw_odds: f64,
    pub season: u32,
}

pub struct BetScraper<F> {
    fetcher: F,
    base_url: Url,
    api_key: String,
    sport: String,
    regions: String,
    markets: String,
    season: u32,
    window: OddsWindow,
    games: Vec<Game>,
}

impl<F> fmt::Debug for BetScraper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BetScraper")
            .field("sport", &self.sport)
            .field("window", &self.window)
            .field("games", &self.games.len())
            .finish()
    }
}

impl<F> BetScraper<F>
where
    F: FetchJson,
{
    /// Create a scraper for one window of the odds API.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Transport for the odds API
    /// * `config` - Supplies the API key, base URL, sport, region, market and
    ///   season label
    /// * `window` - Upcoming matches or a historical snapshot
    ///
    /// # Returns
    ///
    /// A scraper with no games yet. Fails with
    /// [`ScrapeError::MissingCredential`] before any request when `config`
    /// carries no API key.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let window = OddsWindow::historical("240816")?;
    /// let mut scraper = BetScraper::new(build_fetcher(&config)?, &config, window)?;
    /// scraper.run_scrape().await?;
    /// let rows = scraper.to_rows()?;
    /// ```
    pub fn new(fetcher: F, config: &ScraplConfig, window: OddsWindow) -> Result<Self> {
        let api_key = config.odds_api_key()?.to_string();
        Ok(Self {
            fetcher,
            base_url: config.odds_base()?,
            api_key,
            sport: config.sport.clone(),
            regions: config.regions.clone(),
            markets: config.markets.clone(),
            season: config.season,
            window,
            games: Vec::new(),
        })
    }

    pub fn endpoint(&self) -> Result<Url> {
        let mut url = self.base_url.join(&self.window.path(&self.sport))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("apiKey", &self.api_key)
                .append_pair("regions", &self.regions)
                .append_pair("markets", &self.markets);
            if let OddsWindow::Historical { date } = &self.window {
                query.append_pair("date", &format!("{}T12:00:00Z", date.format("%Y-%m-%d")));
            }
        }
        Ok(url)
    }

    /// Fetch the window's matches and append them to the games scraped so far.
    ///
    /// # Returns
    ///
    /// The games added by this call. Earlier games stay in
    /// [`games`](Self::games). A match that fails to parse fails the whole
    /// call and nothing is appended.
    #[instrument(level = "info", skip_all, fields(sport = %self.sport, window = ?self.window))]
    pub async fn run_scrape(&mut self) -> Result<&[Game]> {
        let url = self.endpoint()?;
        let raw = self.fetcher.fetch_json(url.as_str()).await?;
        let events = parse_events(raw)?;

        let games = events
            .iter()
            .map(Game::from_event)
            .collect::<Result<Vec<_>>>()?;
        info!(games = games.len(), "Scraped odds");

        let start = self.games.len();
        self.games.extend(games);
        Ok(&self.games[start..])
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// One row per scraped match, team names mapped to their FPL spelling.
    ///
    /// Matches no bookmaker has quoted yet are left out with a warning.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NotScraped`] when nothing has been scraped.
    pub fn to_rows(&self) -> Result<Vec<GameOddsRow>> {
        if self.games.is_empty() {
            return Err(ScrapeError::NotScraped);
        }
        let mut rows = Vec::with_capacity(self.games.len());
        for game in &self.games {
            let agg = match game.aggregated_odds() {
                Ok(agg) => agg,
                Err(e @ ScrapeError::NoBookmakers { .. }) => {
                    warn!(game = %game, error = %e, "Skipping match without bookmakers");
                    continue;
                }
                Err(e) => return Err(e),
            };
            rows.push(GameOddsRow {
                home: fpl_team_name(&game.home_team).to_string(),
                away: fpl_team_name(&game.away_team).to_string(),
                date: game.game_date.to_string(),
                home_odds: agg.home_prob,
                away_odds: agg.away_prob,
                draw_odds: agg.draw_prob,
                season: self.season,
            });
        }
        Ok(rows)
    }
}

fn parse_events(raw: Value) -> Result<Vec<OddsEvent>> {
    let list = match raw {
        Value::Object(mut obj) => obj
            .remove("data")
            .ok_or_else(|| ScrapeError::missing_key("data", "odds-history payload"))?,
        other => other,
    };
    serde_json::from_value(list)
        .map_err(|e| ScrapeError::unexpected_shape(format!("odds payload ({e})"), "a list of matches"))
}

/// Odds API team names that differ from the FPL short names.
pub fn fpl_team_name(name: &str) -> &str {
    match name {
        "Manchester United" => "Manchester Utd",
        "Tottenham Hotspur" => "Tottenham",
        "Nottingham Forest" => "Nottingham",
        "Brighton and Hove Albion" => "Brighton",
        "Leicester City" => "Leicester",
        "Leeds United" => "Leeds",
        "Newcastle United" => "Newcastle",
        "West Ham United" => "West Ham",
        "Wolverhampton Wanderers" => "Wolves",
        "Sheffield United" => "Sheffield Utd",
        other => other,
    }
}
