//! Runs a set of FPL extractors and merges their output into one store.
//!
//! # Lifecycle
//!
//! Every registered extractor starts `NotRun`. [`FplScraper::scrape_all`]
//! runs each `NotRun` extractor once, in registration order, and marks it
//! `Run`. Calling it again only touches extractors that have not run yet.
//!
//! # Failures
//!
//! With [`FailurePolicy::Abort`] the first failing extractor stops the batch
//! and its error is returned. Records merged before the failure stay in the
//! store and the failed extractor stays `NotRun`, so calling `scrape_all`
//! again picks up where the batch stopped. With [`FailurePolicy::Continue`]
//! the failure is recorded in [`FplScraper::failures`] and the batch goes on.

use crate::config::{FailurePolicy, ScraplConfig};
use crate::error::{Result, ScrapeError};
use crate::fetch::FetchJson;
use crate::models::{AggregateStore, Record};
use crate::scrapers::general::ELEMENT_MAP;
use crate::scrapers::{Extractor, ExtractorKind, ExtractorSpec};
use itertools::Itertools;
use std::fmt;
use tracing::{error, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotRun,
    Run,
}

#[derive(Debug)]
struct ExtractorSlot {
    extractor: Extractor,
    state: RunState,
}

/// An extractor that failed during the last batch.
#[derive(Debug)]
pub struct ExtractorFailure {
    pub extractor: Extractor,
    pub error: ScrapeError,
}

pub struct FplScraper<F> {
    fetcher: F,
    base_url: Url,
    policy: FailurePolicy,
    slots: Vec<ExtractorSlot>,
    store: AggregateStore,
    failures: Vec<ExtractorFailure>,
}

impl<F> fmt::Debug for FplScraper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FplScraper")
            .field("base_url", &self.base_url.as_str())
            .field("policy", &self.policy)
            .field("extractors", &self.slots.len())
            .field("records", &self.store.record_count())
            .finish()
    }
}

impl<F> FplScraper<F>
where
    F: FetchJson,
{
    /// Create an empty scraper.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Transport used by every extractor, usually a
    ///   [`RetryFetch`](crate::fetch::RetryFetch)
    /// * `config` - Supplies the FPL base URL and the failure policy
    ///
    /// # Returns
    ///
    /// A scraper with no extractors, or [`ScrapeError::InvalidUrl`] when the
    /// configured base URL does not parse.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut scraper = FplScraper::new(build_fetcher(&config)?, &config)?;
    /// scraper.register(ExtractorKind::Fixtures, None)?;
    /// let store = scraper.scrape_all().await?;
    /// ```
    pub fn new(fetcher: F, config: &ScraplConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            base_url: config.fpl_base()?,
            policy: config.failure_policy,
            slots: Vec::new(),
            store: AggregateStore::new(),
            failures: Vec::new(),
        })
    }

    /// Build a scraper and register every spec in `specs`.
    pub fn with_specs(
        fetcher: F,
        config: &ScraplConfig,
        specs: impl IntoIterator<Item = ExtractorSpec>,
    ) -> Result<Self> {
        let mut scraper = Self::new(fetcher, config)?;
        for spec in specs {
            scraper.register_spec(spec)?;
        }
        Ok(scraper)
    }

    /// Add one extractor without running it.
    ///
    /// Returns `false` when an extractor with the same kind and index is
    /// already registered; the duplicate is dropped.
    pub fn register(&mut self, kind: ExtractorKind, index: Option<u32>) -> Result<bool> {
        self.register_spec(ExtractorSpec::new(kind, index))
    }

    pub fn register_spec(&mut self, spec: ExtractorSpec) -> Result<bool> {
        let extractor = Extractor::from_spec(spec)?;
        if self.slots.iter().any(|s| s.extractor == extractor) {
            warn!(%extractor, "Extractor already registered; ignoring duplicate");
            return Ok(false);
        }
        self.slots.push(ExtractorSlot {
            extractor,
            state: RunState::NotRun,
        });
        Ok(true)
    }

    /// Seed the default extractor set: general info, one player extractor per
    /// player, and fixtures.
    ///
    /// General info is scraped straight away because the player ids come from
    /// its element map.
    pub async fn init_all(&mut self) -> Result<usize> {
        self.init_with_players(None).await
    }

    /// Like [`init_all`](Self::init_all), but `players` replaces the player
    /// ids discovered from the element map when given.
    ///
    /// # Arguments
    ///
    /// * `players` - Explicit player ids, registered in the order given with
    ///   repeats dropped. `None` registers every id in the element map in
    ///   ascending numeric order, which is not necessarily the payload order.
    ///
    /// # Returns
    ///
    /// The number of registered extractors. General info is fetched at most
    /// once: if it already ran, its element map is read back from the store.
    #[instrument(level = "info", skip_all)]
    pub async fn init_with_players(&mut self, players: Option<&[u32]>) -> Result<usize> {
        info!("Initializing all extractors");

        let general = match self.position(Extractor::General) {
            Some(idx) => idx,
            None => {
                self.register(ExtractorKind::General, None)?;
                self.slots.len() - 1
            }
        };

        if self.slots[general].state == RunState::NotRun {
            info!("Scraping general info to retrieve ids for dependent extractors");
            let envelope = self.slots[general]
                .extractor
                .run(&self.fetcher, &self.base_url)
                .await?;
            self.store.merge(envelope);
            self.slots[general].state = RunState::Run;
        }

        let ids: Vec<u32> = match players {
            Some(ids) => ids.iter().copied().unique().collect(),
            None => {
                let element_map = self
                    .store
                    .records(Extractor::General.scraper_type(), ELEMENT_MAP)
                    .ok_or_else(|| ScrapeError::missing_key(ELEMENT_MAP, "general info"))?;
                player_ids(element_map)?
            }
        };
        let new_ids: Vec<u32> = ids
            .into_iter()
            .filter(|id| self.position(Extractor::Player(*id)).is_none())
            .collect();
        info!(players = new_ids.len(), "Registering player extractors");
        for id in new_ids {
            self.register(ExtractorKind::Player, Some(id))?;
        }

        if self.position(Extractor::Fixtures).is_none() {
            self.register(ExtractorKind::Fixtures, None)?;
        }

        Ok(self.slots.len())
    }

    /// Run every extractor that has not run yet and merge its output.
    ///
    /// # Returns
    ///
    /// The store holding everything merged so far, including output from
    /// earlier calls.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NoExtractors`] when nothing is registered; no request is
    /// made. Under [`FailurePolicy::Abort`], the first extractor error.
    #[instrument(level = "info", skip_all)]
    pub async fn scrape_all(&mut self) -> Result<&AggregateStore> {
        if self.slots.is_empty() {
            return Err(ScrapeError::NoExtractors);
        }
        self.failures.clear();

        let pending: Vec<usize> = self
            .slots
            .iter()
            .positions(|s| s.state == RunState::NotRun)
            .collect();
        info!(
            total = self.slots.len(),
            pending = pending.len(),
            "Scraping all extractors"
        );

        for idx in pending {
            let extractor = self.slots[idx].extractor;
            match extractor.run(&self.fetcher, &self.base_url).await {
                Ok(envelope) => {
                    self.store.merge(envelope);
                    self.slots[idx].state = RunState::Run;
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        error!(%extractor, error = %e, "Extractor failed; aborting batch");
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        warn!(%extractor, error = %e, "Extractor failed; continuing");
                        self.failures.push(ExtractorFailure {
                            extractor,
                            error: e,
                        });
                    }
                },
            }
        }

        info!(
            records = self.store.record_count(),
            failed = self.failures.len(),
            "Scrape complete"
        );
        Ok(&self.store)
    }

    /// Empty the store and mark every extractor `NotRun`.
    #[cfg(test)]
    pub fn reset(&mut self) {
        self.store.clear();
        self.failures.clear();
        for slot in &mut self.slots {
            slot.state = RunState::NotRun;
        }
        info!("Cleared all scraped data");
    }

    pub fn extractors(&self) -> impl Iterator<Item = (Extractor, RunState)> + '_ {
        self.slots.iter().map(|s| (s.extractor, s.state))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn store(&self) -> &AggregateStore {
        &self.store
    }


    pub fn failures(&self) -> &[ExtractorFailure] {
        &self.failures
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn position(&self, extractor: Extractor) -> Option<usize> {
        self.slots.iter().position(|s| s.extractor == extractor)
    }
}

/// Player ids keyed in an element map, ascending and without repeats.
fn player_ids(element_map: &[Record]) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for record in element_map {
        for key in record.keys() {
            let id = key
                .parse::<u32>()
                .map_err(|_| ScrapeError::unexpected_shape("element_map key", "a player id"))?;
            ids.push(id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use crate::scrapers::fixtures::FIXTURES;
    use crate::scrapers::gameweek::GW_STATS;
    use crate::scrapers::general::fixture_data::bootstrap;
    use crate::scrapers::general::TEAM_MAP;
    use crate::scrapers::player::PLAYER_STATS;
    use serde_json::{Value, json};

    const BASE: &str = "https://fpl.test/api/";

    fn config() -> ScraplConfig {
        ScraplConfig {
            fpl_base_url: BASE.to_string(),
            ..ScraplConfig::default()
        }
    }

    fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    fn history(id: u32, rounds: u32) -> Value {
        let rows: Vec<Value> = (1..=rounds)
            .map(|r| json!({ "element": id, "round": r, "total_points": r }))
            .collect();
        json!({ "history": rows })
    }

    fn live(ids: &[u32], fixture: u32) -> Value {
        let rows: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "stats": { "minutes": 90 }, "explain": [ { "fixture": fixture } ] }))
            .collect();
        json!({ "elements": rows })
    }

    fn fixtures_payload() -> Value {
        json!([{
            "event": 1, "finished": true, "id": 1, "kickoff_time": "2024-08-16T19:00:00Z",
            "team_a": 9, "team_h": 14, "team_a_difficulty": 2, "team_h_difficulty": 3,
            "team_a_score": 0, "team_h_score": 1
        }])
    }

    fn full_stub() -> StubFetcher {
        StubFetcher::new()
            .with(&url("bootstrap-static/"), bootstrap(20, 38, &[3, 1, 2]))
            .with(&url("element-summary/1/"), history(1, 2))
            .with(&url("element-summary/2/"), history(2, 1))
            .with(&url("element-summary/3/"), history(3, 3))
            .with(&url("fixtures/"), fixtures_payload())
            .with(&url("event/1/live/"), live(&[1, 2], 10))
            .with(&url("event/2/live/"), live(&[1, 2, 3], 20))
    }

    #[tokio::test]
    async fn test_scrape_all_without_extractors_is_config_error() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        let err = scraper.scrape_all().await.unwrap_err();
        assert!(matches!(err, ScrapeError::NoExtractors));
        assert_eq!(scraper.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_register_does_not_fetch() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        assert!(scraper.register(ExtractorKind::Fixtures, None).unwrap());
        assert!(scraper.register(ExtractorKind::Gameweek, Some(1)).unwrap());
        assert_eq!(scraper.len(), 2);
        assert_eq!(scraper.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_index() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        let err = scraper.register(ExtractorKind::Gameweek, None).unwrap_err();
        assert!(err.is_config());
        assert!(scraper.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_ignored() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        assert!(scraper.register(ExtractorKind::Player, Some(1)).unwrap());
        assert!(!scraper.register(ExtractorKind::Player, Some(1)).unwrap());
        assert!(scraper.register(ExtractorKind::Player, Some(2)).unwrap());
        assert_eq!(scraper.len(), 2);
    }

    #[tokio::test]
    async fn test_second_scrape_does_not_refetch() {
        let specs = [
            ExtractorSpec::new(ExtractorKind::Fixtures, None),
            ExtractorSpec::new(ExtractorKind::Player, Some(1)),
        ];
        let mut scraper = FplScraper::with_specs(full_stub(), &config(), specs).unwrap();

        scraper.scrape_all().await.unwrap();
        assert_eq!(scraper.fetcher().calls(), 2);

        let store = scraper.scrape_all().await.unwrap();
        assert_eq!(store.records("player", PLAYER_STATS).unwrap().len(), 2);
        assert_eq!(scraper.fetcher().calls(), 2);
        assert!(scraper.extractors().all(|(_, state)| state == RunState::Run));
    }

    #[tokio::test]
    async fn test_reset_allows_fresh_scrape() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        scraper.register(ExtractorKind::Fixtures, None).unwrap();
        scraper.scrape_all().await.unwrap();

        scraper.reset();
        assert!(scraper.store().is_empty());
        assert!(scraper.extractors().all(|(_, state)| state == RunState::NotRun));

        let store = scraper.scrape_all().await.unwrap();
        assert_eq!(store.records("fixtures", FIXTURES).unwrap().len(), 1);
        assert_eq!(scraper.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_same_sub_type_concatenates_in_registration_order() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        scraper.register(ExtractorKind::Gameweek, Some(2)).unwrap();
        scraper.register(ExtractorKind::Gameweek, Some(1)).unwrap();

        let store = scraper.scrape_all().await.unwrap();
        let rows = store.records("gameweek", GW_STATS).unwrap();
        assert_eq!(rows.len(), 5);
        let fixtures: Vec<_> = rows.iter().map(|r| r["fixture_id"].as_u64().unwrap()).collect();
        assert_eq!(fixtures, vec![20, 20, 20, 10, 10]);
    }

    #[tokio::test]
    async fn test_init_all_discovers_players() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        let count = scraper.init_all().await.unwrap();

        // general + 3 players + fixtures
        assert_eq!(count, 5);
        assert_eq!(scraper.fetcher().calls(), 1);
        let registered: Vec<_> = scraper.extractors().collect();
        assert_eq!(registered[0], (Extractor::General, RunState::Run));
        assert_eq!(registered[1], (Extractor::Player(1), RunState::NotRun));
        assert_eq!(registered[3], (Extractor::Player(3), RunState::NotRun));
        assert_eq!(registered[4], (Extractor::Fixtures, RunState::NotRun));
        assert_eq!(scraper.store().records("general", TEAM_MAP).unwrap()[0].len(), 20);

        let store = scraper.scrape_all().await.unwrap();
        let elements: Vec<_> = store
            .records("player", PLAYER_STATS)
            .unwrap()
            .iter()
            .map(|r| r["element"].as_u64().unwrap())
            .collect();
        assert_eq!(elements, vec![1, 1, 2, 3, 3, 3]);
        assert_eq!(scraper.fetcher().calls(), 5);
        assert_eq!(scraper.fetcher().calls_to(&url("bootstrap-static/")), 1);
    }

    #[tokio::test]
    async fn test_init_with_explicit_players() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        scraper.init_with_players(Some(&[2, 2, 3])).await.unwrap();
        let players: Vec<_> = scraper
            .extractors()
            .filter(|(e, _)| e.kind() == ExtractorKind::Player)
            .map(|(e, _)| e)
            .collect();
        assert_eq!(players, vec![Extractor::Player(2), Extractor::Player(3)]);
    }

    #[tokio::test]
    async fn test_init_all_reuses_registered_general_and_fixtures() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        scraper.register(ExtractorKind::General, None).unwrap();
        scraper.register(ExtractorKind::Fixtures, None).unwrap();

        // general + fixtures + 3 players, nothing registered twice
        assert_eq!(scraper.init_all().await.unwrap(), 5);
        assert_eq!(scraper.fetcher().calls(), 1);
        let registered: Vec<_> = scraper.extractors().collect();
        assert_eq!(registered[0], (Extractor::General, RunState::Run));
        assert_eq!(registered[1], (Extractor::Fixtures, RunState::NotRun));
        assert_eq!(registered[2], (Extractor::Player(1), RunState::NotRun));

        // general already ran, so a second init is a no-op
        assert_eq!(scraper.init_all().await.unwrap(), 5);
        assert_eq!(scraper.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_init_all_after_general_ran_reads_store() {
        let mut scraper = FplScraper::new(full_stub(), &config()).unwrap();
        scraper.register(ExtractorKind::General, None).unwrap();
        scraper.scrape_all().await.unwrap();
        assert_eq!(scraper.fetcher().calls(), 1);

        // general + 3 players + fixtures, element map taken from the store
        assert_eq!(scraper.init_all().await.unwrap(), 5);
        assert_eq!(scraper.fetcher().calls_to(&url("bootstrap-static/")), 1);
        let players: Vec<_> = scraper
            .extractors()
            .filter(|(e, _)| e.kind() == ExtractorKind::Player)
            .map(|(e, _)| e)
            .collect();
        assert_eq!(
            players,
            vec![Extractor::Player(1), Extractor::Player(2), Extractor::Player(3)]
        );
    }

    #[tokio::test]
    async fn test_abort_policy_stops_batch_and_resumes() {
        let stub = full_stub().fail_times(&url("element-summary/2/"), 1);
        let mut scraper = FplScraper::new(stub, &config()).unwrap();
        for id in 1..=3 {
            scraper.register(ExtractorKind::Player, Some(id)).unwrap();
        }

        let err = scraper.scrape_all().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 503, .. }));
        let states: Vec<_> = scraper.extractors().map(|(_, s)| s).collect();
        assert_eq!(states, vec![RunState::Run, RunState::NotRun, RunState::NotRun]);
        assert_eq!(scraper.store().records("player", PLAYER_STATS).unwrap().len(), 2);

        let store = scraper.scrape_all().await.unwrap();
        assert_eq!(store.records("player", PLAYER_STATS).unwrap().len(), 6);
        assert_eq!(scraper.fetcher().calls_to(&url("element-summary/1/")), 1);
    }

    #[tokio::test]
    async fn test_continue_policy_records_failures() {
        let config = ScraplConfig {
            failure_policy: FailurePolicy::Continue,
            ..config()
        };
        let mut scraper = FplScraper::new(full_stub(), &config).unwrap();
        scraper.register(ExtractorKind::Player, Some(1)).unwrap();
        scraper.register(ExtractorKind::Player, Some(99)).unwrap();
        scraper.register(ExtractorKind::Fixtures, None).unwrap();

        let store = scraper.scrape_all().await.unwrap();
        assert_eq!(store.records("player", PLAYER_STATS).unwrap().len(), 2);
        assert_eq!(store.records("fixtures", FIXTURES).unwrap().len(), 1);

        assert_eq!(scraper.failures().len(), 1);
        assert_eq!(scraper.failures()[0].extractor, Extractor::Player(99));
        assert!(scraper.failures()[0].error.is_transport());
    }

    #[tokio::test]
    async fn test_schema_failure_propagates() {
        let stub = StubFetcher::new().with(&url("element-summary/1/"), json!({ "nope": [] }));
        let mut scraper = FplScraper::new(stub, &config()).unwrap();
        scraper.register(ExtractorKind::Player, Some(1)).unwrap();
        let err = scraper.scrape_all().await.unwrap_err();
        assert!(matches!(err, ScrapeError::MissingKey { .. }));
    }
}
