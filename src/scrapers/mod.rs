//! Extractors for the Fantasy Premier League API.
//!
//! Each extractor targets one endpoint shape and knows two things: the URL to
//! fetch and how to project the raw JSON into a [`ResultEnvelope`].
//!
//! # Supported Endpoints
//!
//! | Extractor | Module | Endpoint | Sub-types |
//! |-----------|--------|----------|-----------|
//! | General info | [`general`] | `bootstrap-static/` | `team_map`, `gw_deadlines`, `element_map` |
//! | Fixtures | [`fixtures`] | `fixtures/` | `fixtures` |
//! | Gameweek stats | [`gameweek`] | `event/{gw}/live/` | `gw_stats` |
//! | Player stats | [`player`] | `element-summary/{id}/` | `player_stats` |
//!
//! The set is closed: [`Extractor`] is an enum and dispatch is a `match`.
//!
//! # Errors
//!
//! Parsers never default-fill. A missing key or a value of the wrong type is a
//! schema error and is returned as-is.

pub mod fixtures;
pub mod gameweek;
pub mod general;
pub mod player;

use crate::error::{Result, ScrapeError};
use crate::fetch::FetchJson;
use crate::models::{Record, ResultEnvelope};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, instrument};
use url::Url;

/// Which extractor family to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    General,
    Fixtures,
    Gameweek,
    Player,
}

impl ExtractorKind {
    /// The `scraper_type` this kind writes into the store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Fixtures => "fixtures",
            Self::Gameweek => "gameweek",
            Self::Player => "player",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipe for one extractor. `index` is the gameweek number for
/// `gameweek` and the player id for `player`, and must be absent otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct ExtractorSpec {
    pub kind: ExtractorKind,
    #[serde(default)]
    pub index: Option<u32>,
}

impl ExtractorSpec {
    pub fn new(kind: ExtractorKind, index: Option<u32>) -> Self {
        Self { kind, index }
    }
}

/// One fetch + parse unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extractor {
    General,
    Fixtures,
    Gameweek(u32),
    Player(u32),
}

impl Extractor {
    pub fn from_spec(spec: ExtractorSpec) -> Result<Self> {
        match (spec.kind, spec.index) {
            (ExtractorKind::General, None) => Ok(Self::General),
            (ExtractorKind::Fixtures, None) => Ok(Self::Fixtures),
            (ExtractorKind::Gameweek, Some(gw)) => Ok(Self::Gameweek(gw)),
            (ExtractorKind::Player, Some(id)) => Ok(Self::Player(id)),
            (kind @ (ExtractorKind::General | ExtractorKind::Fixtures), Some(i)) => Err(
                ScrapeError::InvalidSpec(format!("{kind} takes no index, got {i}")),
            ),
            (kind, None) => Err(ScrapeError::InvalidSpec(format!(
                "{kind} needs an index"
            ))),
        }
    }

    pub fn kind(&self) -> ExtractorKind {
        match self {
            Self::General => ExtractorKind::General,
            Self::Fixtures => ExtractorKind::Fixtures,
            Self::Gameweek(_) => ExtractorKind::Gameweek,
            Self::Player(_) => ExtractorKind::Player,
        }
    }

    #[cfg(test)]
    pub fn spec(&self) -> ExtractorSpec {
        let index = match self {
            Self::General | Self::Fixtures => None,
            Self::Gameweek(i) | Self::Player(i) => Some(*i),
        };
        ExtractorSpec::new(self.kind(), index)
    }

    pub fn scraper_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Endpoint path relative to the API root.
    pub fn path(&self) -> String {
        match self {
            Self::General => general::PATH.to_string(),
            Self::Fixtures => fixtures::PATH.to_string(),
            Self::Gameweek(gw) => gameweek::path(*gw),
            Self::Player(id) => player::path(*id),
        }
    }

    pub fn url(&self, base: &Url) -> Result<Url> {
        Ok(base.join(&self.path())?)
    }

    pub fn parse(&self, raw: &Value) -> Result<ResultEnvelope> {
        match self {
            Self::General => general::parse(raw),
            Self::Fixtures => fixtures::parse(raw),
            Self::Gameweek(_) => gameweek::parse(raw),
            Self::Player(_) => player::parse(raw),
        }
    }

    /// Fetch this extractor's endpoint and parse the payload.
    #[instrument(level = "info", skip(fetcher, base), fields(extractor = %self))]
    pub async fn run<F: FetchJson>(&self, fetcher: &F, base: &Url) -> Result<ResultEnvelope> {
        let url = self.url(base)?;
        let raw = fetcher.fetch_json(url.as_str()).await?;
        let envelope = self.parse(&raw)?;
        for table in envelope.sub_types() {
            if table.is_empty() {
                debug!(scraper_type = envelope.scraper_type(), sub_type = %table.sub_type, "Empty table");
            }
        }
        info!(records = envelope.record_count(), "Scraped {}", envelope.scraper_type());
        Ok(envelope)
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General | Self::Fixtures => write!(f, "{}", self.kind()),
            Self::Gameweek(i) | Self::Player(i) => write!(f, "{}[{}]", self.kind(), i),
        }
    }
}

pub(crate) fn field<'a>(value: &'a Value, key: &str, context: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| ScrapeError::missing_key(key, context))
}

pub(crate) fn array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ScrapeError::unexpected_shape(context, "an array"))
}

pub(crate) fn object<'a>(value: &'a Value, context: &str) -> Result<&'a Record> {
    value
        .as_object()
        .ok_or_else(|| ScrapeError::unexpected_shape(context, "an object"))
}

/// Render an `id` value as a map key. FPL ids are integers.
pub(crate) fn id_key(value: &Value, context: &str) -> Result<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(ScrapeError::unexpected_shape(context, "a numeric id")),
    }
}

/// Copy `keys` out of `source` in order, failing on the first one missing.
pub(crate) fn project(source: &Value, keys: &[&str], context: &str) -> Result<Record> {
    let mut out = Record::new();
    for key in keys {
        out.insert((*key).to_string(), field(source, key, context)?.clone());
    }
    Ok(out)
}
