//! Error types shared by the fetcher, the extractors, the orchestrator and
//! the odds aggregator.
//!
//! Variants fall into four families:
//!
//! | Family | Variants | Retried? |
//! |--------|----------|----------|
//! | Transport | `Http`, `Status`, `Decode` | yes, inside the fetcher |
//! | Schema | `MissingKey`, `UnexpectedShape`, `MissingOutcome` | no |
//! | Configuration | `NoExtractors`, `MissingCredential`, `InvalidSpec`, `InvalidUrl`, `InvalidDate`, `ConfigFile` | no, raised before any request |
//! | Aggregation input | `NoBookmakers`, `DegenerateOdds`, `InvalidPrice` | no |

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing key `{key}` in {context}")]
    MissingKey { key: String, context: String },

    #[error("expected {expected} in {context}")]
    UnexpectedShape { context: String, expected: &'static str },

    #[error("bookmaker `{bookmaker}` has no `{outcome}` outcome")]
    MissingOutcome { outcome: String, bookmaker: String },

    #[error("no extractors registered; register some or call init_all() first")]
    NoExtractors,

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid extractor spec: {0}")]
    InvalidSpec(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("could not load config file: {0}")]
    ConfigFile(String),

    #[error("no bookmakers quoted {home} v {away}")]
    NoBookmakers { home: String, away: String },

    #[error("implied probabilities from `{bookmaker}` sum to zero")]
    DegenerateOdds { bookmaker: String },

    #[error("price {price} for `{outcome}` is not a positive decimal price")]
    InvalidPrice { outcome: String, price: f64 },

    #[error("no games scraped yet; run the odds scrape first")]
    NotScraped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            context: context.into(),
        }
    }

    pub fn unexpected_shape(context: impl Into<String>, expected: &'static str) -> Self {
        Self::UnexpectedShape {
            context: context.into(),
            expected,
        }
    }

    /// Whether the fetcher should spend another attempt on this error.
    ///
    /// Only transport failures qualify; a payload that decodes but has the
    /// wrong shape will not improve on a second request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Decode { .. }
        )
    }

    /// Whether this is a configuration failure raised before any network
    /// activity.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::NoExtractors
                | Self::MissingCredential(_)
                | Self::InvalidSpec(_)
                | Self::InvalidUrl(_)
                | Self::InvalidDate(_)
                | Self::ConfigFile(_)
        )
    }
}
