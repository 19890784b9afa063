//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the engine, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Single GET requests with outcome classification
//! - Bounded exponential-backoff retry
//! - Cancellation of in-flight requests and backoff sleeps

use crate::config::{RemoteConfig, RetryConfig, UserAgentConfig};
use crate::{FetchError, FetchErrorKind, IngestError};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What the caller expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Sends `Accept: application/json`
    Json,
    /// HTML pages and image bytes
    Plain,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use wp_ingest::config::{RemoteConfig, UserAgentConfig};
/// use wp_ingest::ingest::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "WpIngest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&RemoteConfig::default(), &user_agent).unwrap();
/// ```
pub fn build_http_client(
    remote: &RemoteConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(remote.timeout_secs))
        .connect_timeout(Duration::from_secs(remote.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounds for the retrying fetch mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_elapsed: Option<Duration>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            max_elapsed: (config.max_elapsed_secs > 0)
                .then(|| Duration::from_secs(config.max_elapsed_secs)),
        }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            max_elapsed: None,
        }
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry`, capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// HTTP client bound to a retry policy and a cancellation token
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(client: Client, retry: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            client,
            retry,
            cancel,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Performs exactly one GET request
    ///
    /// Non-2xx statuses, connection failures and timeouts are classified and
    /// logged at error level; the caller decides whether to retry.
    pub async fn fetch_once(&self, url: &str, mode: FetchMode) -> Result<Vec<u8>, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(cancelled(url, 0));
        }

        let mut request = self.client.get(url);
        if mode == FetchMode::Json {
            request = request.header(ACCEPT, "application/json");
        }

        let attempt = async move {
            let response = request.send().await.map_err(|e| classify(url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError {
                    url: url.to_string(),
                    kind: FetchErrorKind::HttpStatus(status.as_u16()),
                    message: status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string(),
                    attempts: 1,
                });
            }
            let body = response.bytes().await.map_err(|e| classify(url, e))?;
            Ok(body.to_vec())
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled(url, 1)),
            result = attempt => result,
        };

        match &result {
            Ok(body) => tracing::info!(url = %url, bytes = body.len(), "Fetched"),
            Err(e) if e.kind == FetchErrorKind::Cancelled => {
                tracing::debug!(url = %url, "Fetch cancelled")
            }
            Err(e) => tracing::error!(url = %url, kind = %e.kind, error = %e.message, "Fetch failed"),
        }

        result
    }

    /// Fetches with bounded exponential backoff
    ///
    /// Gives up with `RetriesExhausted` once `max_attempts` attempts have
    /// failed or the next sleep would cross `max_elapsed`. Errors that cannot
    /// heal by waiting (most 4xx statuses) are returned at once. Cancellation
    /// interrupts both the request and the sleep.
    pub async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match self.fetch_once(url, mode).await {
                Ok(body) => return Ok(body),
                Err(e) => FetchError { attempts, ..e },
            };

            if !error.kind.is_retryable() {
                return Err(error);
            }

            if attempts >= self.retry.max_attempts {
                return Err(exhausted(error));
            }

            let delay = self.retry.backoff(attempts - 1);
            if let Some(max_elapsed) = self.retry.max_elapsed {
                if started.elapsed() + delay > max_elapsed {
                    return Err(exhausted(error));
                }
            }

            tracing::warn!(
                url = %url,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying after {}",
                error.kind
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(cancelled(url, attempts)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Fetches and decodes a JSON document
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, IngestError> {
        let body = self.fetch(url, FetchMode::Json).await?;
        serde_json::from_slice(&body).map_err(|e| IngestError::UnexpectedPayload {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches an HTML page as text
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch(url, FetchMode::Plain).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetches raw bytes
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch(url, FetchMode::Plain).await
    }
}

/// Maps a reqwest error onto the fetch classification
fn classify(url: &str, error: reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() {
        FetchErrorKind::Connection
    } else if let Some(status) = error.status() {
        FetchErrorKind::HttpStatus(status.as_u16())
    } else {
        FetchErrorKind::Other
    };

    FetchError {
        url: url.to_string(),
        kind,
        message: error.to_string(),
        attempts: 1,
    }
}

fn cancelled(url: &str, attempts: u32) -> FetchError {
    FetchError {
        url: url.to_string(),
        kind: FetchErrorKind::Cancelled,
        message: "cancellation requested".to_string(),
        attempts,
    }
}

fn exhausted(last: FetchError) -> FetchError {
    FetchError {
        kind: FetchErrorKind::RetriesExhausted,
        message: format!("last error: {} ({})", last.kind, last.message),
        ..last
    }
}
