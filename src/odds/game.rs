//! One match from the odds API.
//!
//! Per-bookmaker quotes are computed when the [`Game`] is built; the
//! cross-bookmaker aggregate is computed on request by
//! [`Game::aggregated_odds`] and is not cached.

use super::{MatchOddsAggregate, OddsEvent, OddsQuote};
use crate::error::{Result, ScrapeError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use tracing::debug;

const COMMENCE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One bookmaker's view of a match, before and after margin removal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmakerOdds {
    pub bookmaker: String,
    pub updated_at: Option<String>,
    pub raw: OddsQuote,
    pub adjusted: OddsQuote,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub home_team: String,
    pub away_team: String,
    pub game_date: NaiveDate,
    pub bookmaker_odds: Vec<BookmakerOdds>,
}

impl Game {
    /// Parse one event and quote every bookmaker's first market.
    pub fn from_event(event: &OddsEvent) -> Result<Self> {
        let game_date = NaiveDateTime::parse_from_str(&event.commence_time, COMMENCE_FORMAT)
            .map_err(|_| ScrapeError::unexpected_shape("commence_time", "YYYY-MM-DDTHH:MM:SSZ"))?
            .date();

        let bookmaker_odds = event
            .bookmakers
            .iter()
            .map(|bookie| {
                let market = bookie
                    .markets
                    .first()
                    .ok_or_else(|| ScrapeError::missing_key("markets[0]", &bookie.key))?;
                let raw = OddsQuote::from_outcomes(
                    &market.outcomes,
                    &event.home_team,
                    &event.away_team,
                    &bookie.key,
                )?;
                debug!(bookmaker = %bookie.key, overround = raw.overround(), "Quoted");
                Ok(BookmakerOdds {
                    bookmaker: bookie.key.clone(),
                    updated_at: bookie.last_update.clone(),
                    raw,
                    adjusted: raw.normalized(&bookie.key)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            home_team: event.home_team.clone(),
            away_team: event.away_team.clone(),
            game_date,
            bookmaker_odds,
        })
    }

    /// Mean margin-free probabilities across bookmakers.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NoBookmakers`] when no bookmaker quoted the match.
    pub fn aggregated_odds(&self) -> Result<MatchOddsAggregate> {
        let adjusted: Vec<OddsQuote> = self.bookmaker_odds.iter().map(|b| b.adjusted).collect();
        MatchOddsAggregate::mean(&adjusted, &self.home_team, &self.away_team)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v {} on {}",
            self.home_team, self.away_team, self.game_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::fixture_data::{bookmaker, event, example_event};
    use serde_json::{Value, json};

    fn parse(value: Value) -> OddsEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_event() {
        let game = Game::from_event(&parse(example_event())).unwrap();
        assert_eq!(game.home_team, "Manchester United");
        assert_eq!(game.away_team, "Fulham");
        assert_eq!(game.game_date, NaiveDate::from_ymd_opt(2024, 8, 16).unwrap());
        assert_eq!(game.bookmaker_odds.len(), 2);

        let alpha = &game.bookmaker_odds[0];
        assert_eq!(alpha.bookmaker, "alpha");
        assert_eq!(alpha.updated_at.as_deref(), Some("2024-08-15T10:00:00Z"));
        assert!((alpha.raw.home_prob - 0.5).abs() < 1e-9);
        assert!((alpha.adjusted.total() - 1.0).abs() < 1e-9);
        assert_eq!(game.to_string(), "Manchester United v Fulham on 2024-08-16");
    }

    #[test]
    fn test_aggregated_odds() {
        let game = Game::from_event(&parse(example_event())).unwrap();
        let agg = game.aggregated_odds().unwrap();
        assert!((agg.home_prob - 0.493884).abs() < 1e-4);
        assert!((agg.away_prob - 0.234918).abs() < 1e-4);
        assert!((agg.draw_prob - 0.271198).abs() < 1e-4);
        assert!((agg.home_prob + agg.away_prob + agg.draw_prob - 1.0).abs() < 1e-9);
        assert_eq!(game.aggregated_odds().unwrap(), agg);
    }

    #[test]
    fn test_no_bookmakers() {
        let game = Game::from_event(&parse(event("Arsenal", "Wolves", vec![]))).unwrap();
        assert!(matches!(
            game.aggregated_odds(),
            Err(ScrapeError::NoBookmakers { .. })
        ));
    }

    #[test]
    fn test_bookmaker_missing_draw() {
        let mut bk = bookmaker("gamma", ("Arsenal", 1.5), ("Wolves", 7.0), 4.5);
        bk["markets"][0]["outcomes"].as_array_mut().unwrap().pop();
        let err = Game::from_event(&parse(event("Arsenal", "Wolves", vec![bk]))).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingOutcome { ref outcome, .. } if outcome == "Draw"));
    }

    #[test]
    fn test_bookmaker_without_markets() {
        let mut bk = bookmaker("gamma", ("Arsenal", 1.5), ("Wolves", 7.0), 4.5);
        bk["markets"] = json!([]);
        let err = Game::from_event(&parse(event("Arsenal", "Wolves", vec![bk]))).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingKey { .. }));
    }

    #[test]
    fn test_bad_commence_time() {
        let mut ev = example_event();
        ev["commence_time"] = json!("16/08/2024 20:00");
        let err = Game::from_event(&parse(ev)).unwrap_err();
        assert!(matches!(err, ScrapeError::UnexpectedShape { .. }));
    }
}
