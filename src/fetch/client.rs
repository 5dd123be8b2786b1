//! HTTP fetch client
//!
//! Every outbound request in the pipeline goes through [`FetchClient`],
//! which enforces the pacing gate and the retry policy. There is no caching
//! layer here: freshness is the enrichment scheduler's job.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 404 | Immediate `NotFound` |
//! | Other 4xx | Immediate `Http` |
//! | HTTP 429 | Retry with backoff, `Retry-After` preferred |
//! | HTTP 5xx | Retry with backoff |
//! | Timeout / connection error | Retry with backoff |
//! | Retries exhausted | `Exhausted { url, last_status }` |

use crate::config::{FetchConfig, UserAgentConfig};
use crate::fetch::pacing::PacingGate;
use crate::url::extract_host;
use rand::Rng;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a fetch, classified per the pipeline's error taxonomy
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("404 Not Found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("URL has no usable host: {url}")]
    InvalidUrl { url: String },

    #[error("Retries exhausted for {url} (last status: {last_status:?})")]
    Exhausted {
        url: String,
        last_status: Option<u16>,
    },
}

/// Coarse classification used by stage reports and retry-next-run policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Deferred to the next run; the target stays eligible
    Transient,
    /// Recorded; not retried within this run
    Permanent,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NotFound { .. } | Self::Http { .. } | Self::InvalidUrl { .. } => {
                FetchErrorKind::Permanent
            }
            Self::Exhausted { .. } => FetchErrorKind::Transient,
        }
    }
}

/// A successful fetch
#[derive(Debug)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Rate-limited, retrying HTTP client shared by all pipeline stages
pub struct FetchClient {
    client: Client,
    gate: Arc<PacingGate>,
    max_retries: u32,
}

impl FetchClient {
    pub fn new(
        fetch_config: &FetchConfig,
        user_agent: &UserAgentConfig,
        gate: Arc<PacingGate>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_secs(fetch_config.timeout_secs))
            .connect_timeout(Duration::from_secs(fetch_config.connect_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            gate,
            max_retries: fetch_config.max_retries.max(1),
        })
    }

    /// Fetches a URL, waiting for the pacing gate before every attempt.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let host = extract_host(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        let mut last_status: Option<u16> = None;

        for attempt in 0..self.max_retries {
            self.gate.wait_turn(&host).await;

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let final_url = response.url().clone();
                        match response.text().await {
                            Ok(body) => {
                                return Ok(FetchResponse {
                                    final_url,
                                    status: status.as_u16(),
                                    body,
                                })
                            }
                            Err(e) => {
                                // Body cut off mid-transfer; retry like a
                                // transport failure.
                                tracing::debug!(
                                    "Body read failed for {} (attempt {}): {}",
                                    url,
                                    attempt + 1,
                                    e
                                );
                                last_status = Some(status.as_u16());
                            }
                        }
                    } else if status == StatusCode::NOT_FOUND {
                        return Err(FetchError::NotFound {
                            url: url.to_string(),
                        });
                    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_status = Some(status.as_u16());
                        if attempt + 1 < self.max_retries {
                            let wait = backoff_delay(attempt, retry_after(&response));
                            tracing::debug!(
                                "HTTP {} for {}, retrying in {:?} (attempt {}/{})",
                                status.as_u16(),
                                url,
                                wait,
                                attempt + 1,
                                self.max_retries
                            );
                            tokio::time::sleep(wait).await;
                        }
                        continue;
                    } else {
                        // Remaining 4xx are not retryable
                        return Err(FetchError::Http {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) => {
                    last_status = None;
                    if attempt + 1 < self.max_retries {
                        let wait = backoff_delay(attempt, None);
                        tracing::debug!(
                            "Transport error for {} (attempt {}/{}): {}; retrying in {:?}",
                            url,
                            attempt + 1,
                            self.max_retries,
                            e,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                    }
                    continue;
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            last_status,
        })
    }
}

/// Computes the wait before the next attempt.
///
/// A parseable `Retry-After` takes precedence over the exponential backoff;
/// uniform jitter of up to one second is added either way.
fn backoff_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    let base = Duration::from_secs(2u64.saturating_pow(attempt) * 2);
    let wait = retry_after.unwrap_or(base);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..1000));
    wait + jitter
}

/// Parses a `Retry-After` header carrying a whole number of seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
