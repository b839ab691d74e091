//! HTTP GET + JSON decode with a fixed retry budget.
//!
//! # Architecture
//!
//! - [`FetchJson`]: the one capability every extractor needs from the transport
//! - [`HttpFetcher`]: `reqwest` implementation, non-2xx is an error
//! - [`RetryFetch`]: decorator that retries any [`FetchJson`] a fixed number of
//!   times with a fixed pause in between
//!
//! # Retry Strategy
//!
//! - 3 attempts in total by default
//! - Fixed 500 ms delay between attempts (so at most 1 s of extra waiting)
//! - The last failure is returned to the caller unchanged

use crate::config::ScraplConfig;
use crate::error::{Result, ScrapeError};
use crate::utils::{redact_query, truncate_for_log};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Fetch a URL and decode its body as JSON.
pub trait FetchJson {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// Plain `reqwest` transport. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scrapl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl FetchJson for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %redact_query(url)))]
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms = dt.as_millis() as u64,
                body = %truncate_for_log(&body, 200),
                "Non-success status"
            );
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: redact_query(url),
            });
        }

        debug!(bytes = body.len(), elapsed_ms = dt.as_millis() as u64, "Fetched");
        serde_json::from_str(&body).map_err(|source| ScrapeError::Decode {
            url: redact_query(url),
            source,
        })
    }
}

/// Wrapper that retries any [`FetchJson`] implementation on transport failure.
pub struct RetryFetch<T> {
    inner: T,
    max_attempts: usize,
    delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchJson,
{
    /// Wrap `inner` with a fixed retry budget.
    ///
    /// # Arguments
    ///
    /// * `inner` - The transport doing the actual requests
    /// * `max_attempts` - Total attempts including the first; zero is treated
    ///   as one
    /// * `delay` - Pause between consecutive attempts
    ///
    /// # Returns
    ///
    /// A [`FetchJson`] that retries transport failures (`Http`, `Status`,
    /// `Decode`) and returns any other error straight away.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(30))?;
    /// let fetcher = RetryFetch::new(http, 3, Duration::from_millis(500));
    /// let fixtures = fetcher.fetch_json("https://fantasy.premierleague.com/api/fixtures/").await?;
    /// ```
    pub fn new(inner: T, max_attempts: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> FetchJson for RetryFetch<T>
where
    T: FetchJson,
{
    #[instrument(level = "info", skip_all, fields(url = %redact_query(url)))]
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.inner.fetch_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transport() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    error!(attempt, max = self.max_attempts, error = %e, "fetch exhausted retries");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        delay = ?self.delay,
                        error = %e,
                        "fetch attempt failed; retrying"
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// Build the production transport described by `config`.
pub fn build_fetcher(config: &ScraplConfig) -> Result<RetryFetch<HttpFetcher>> {
    let http = HttpFetcher::new(config.request_timeout())?;
    Ok(RetryFetch::new(
        http,
        config.retry.max_attempts,
        config.retry.delay(),
    ))
}
