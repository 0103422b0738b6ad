//! HTTP access with explicit timeouts and optional exponential backoff.
//!
//! Every source shares one [`HttpClient`]. Each request carries a finite
//! timeout; failures are mapped onto [`FetchCause`] so the aggregator can log
//! them uniformly.
//!
//! # Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled:
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::{FetchCause, FetchError};
use rand::{Rng, rng};
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "face_paper_digest/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/face-paper-digest)"
);

/// Request settings shared by every source.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: StdDuration,
    pub user_agent: String,
    pub max_retries: usize,
    pub base_delay: StdDuration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: StdDuration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 0,
            base_delay: StdDuration::from_secs(1),
        }
    }
}

/// Thin wrapper around a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            max_delay: StdDuration::from_secs(30),
        })
    }

    /// GET `url` and return the body as text.
    ///
    /// `source` and `query` only label the resulting [`FetchError`].
    #[instrument(level = "debug", skip(self), fields(%source, %query))]
    pub async fn get_text(&self, source: &str, query: &str, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.get_once(url).await {
                Ok(body) => {
                    debug!(
                        bytes = body.len(),
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        "GET succeeded"
                    );
                    return Ok(body);
                }
                Err(cause) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %cause,
                                "GET exhausted retries"
                            );
                        }
                        return Err(FetchError::new(source, query, cause));
                    }

                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %cause,
                        "GET attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchCause> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchCause::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    fn backoff_delay(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let mut delay = self.base_delay.saturating_mul(1 << shift);
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}
