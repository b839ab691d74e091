//! Betting odds: payload models and margin-free probabilities.
//!
//! # Pipeline
//!
//! ```text
//! bookmaker prices ──1/price──▶ OddsQuote (sums to > 1)
//!                  ──÷ sum────▶ OddsQuote (sums to 1)
//!                  ──mean─────▶ MatchOddsAggregate
//! ```
//!
//! Empty input and degenerate prices are errors, never `NaN` or zero.
//!
//! - [`game`]: one match and its per-bookmaker quotes
//! - [`scraper`]: fetches upcoming or historical matches from the odds API

pub mod game;
pub mod scraper;

use crate::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};

/// Outcome name the odds API uses for a draw.
pub const DRAW: &str = "Draw";

/// One match as returned by the odds API.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub markets: Vec<OddsMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsMarket {
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub price: f64,
}

/// Home / away / draw probabilities from one bookmaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsQuote {
    pub home_prob: f64,
    pub away_prob: f64,
    pub draw_prob: f64,
}

impl OddsQuote {
    /// Implied probabilities (`1 / price`) for the first outcome matching
    /// each of `home`, `away` and [`DRAW`].
    pub fn from_outcomes(
        outcomes: &[Outcome],
        home: &str,
        away: &str,
        bookmaker: &str,
    ) -> Result<Self> {
        let implied = |name: &str| -> Result<f64> {
            let outcome = outcomes.iter().find(|o| o.name == name).ok_or_else(|| {
                ScrapeError::MissingOutcome {
                    outcome: name.to_string(),
                    bookmaker: bookmaker.to_string(),
                }
            })?;
            if !outcome.price.is_finite() || outcome.price <= 0.0 {
                return Err(ScrapeError::InvalidPrice {
                    outcome: name.to_string(),
                    price: outcome.price,
                });
            }
            Ok(1.0 / outcome.price)
        };

        Ok(Self {
            home_prob: implied(home)?,
            away_prob: implied(away)?,
            draw_prob: implied(DRAW)?,
        })
    }

    pub fn total(&self) -> f64 {
        self.home_prob + self.away_prob + self.draw_prob
    }

    /// Bookmaker margin: how far the implied probabilities exceed 1.
    pub fn overround(&self) -> f64 {
        self.total() - 1.0
    }

    /// Scale the three probabilities so they sum to 1.
    pub fn normalized(&self, bookmaker: &str) -> Result<Self> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return Err(ScrapeError::DegenerateOdds {
                bookmaker: bookmaker.to_string(),
            });
        }
        Ok(Self {
            home_prob: self.home_prob / total,
            away_prob: self.away_prob / total,
            draw_prob: self.draw_prob / total,
        })
    }
}

/// Mean of margin-free quotes across every bookmaker for one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchOddsAggregate {
    pub home_prob: f64,
    pub away_prob: f64,
    pub draw_prob: f64,
}

impl MatchOddsAggregate {
    /// Element-wise mean of `quotes`. `home` and `away` only label the error
    /// raised when `quotes` is empty.
    pub fn mean(quotes: &[OddsQuote], home: &str, away: &str) -> Result<Self> {
        if quotes.is_empty() {
            return Err(ScrapeError::NoBookmakers {
                home: home.to_string(),
                away: away.to_string(),
            });
        }
        let n = quotes.len() as f64;
        let sum = |f: fn(&OddsQuote) -> f64| quotes.iter().map(f).sum::<f64>() / n;
        Ok(Self {
            home_prob: sum(|q| q.home_prob),
            away_prob: sum(|q| q.away_prob),
            draw_prob: sum(|q| q.draw_prob),
        })
    }
}
