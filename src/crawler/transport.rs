//! HTTP transport for the provider API
//!
//! This module handles every request the crawler sends, including:
//! - Building the HTTP client with timeouts and a user agent
//! - Bearer-token authentication
//! - Retrying transient failures with exponential backoff
//! - Classifying responses and decoding the page payload

use crate::config::{ApiConfig, RetryConfig};
use crate::state::UserRecord;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors returned by the transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server-side failure that persisted through the retry budget
    #[error("transient failure after {attempts} attempts: {message}")]
    Transient {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// Non-retryable HTTP status (4xx, unexpected redirects)
    #[error("request rejected with HTTP {status}: {body}")]
    Client { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// Returns true if the failure came from exhausting the retry budget
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// One decoded page of a paginated response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPage {
    /// Users on this page; absent when the account cannot be retrieved
    #[serde(default)]
    pub data: Option<Vec<UserRecord>>,

    #[serde(default)]
    pub meta: PageMeta,

    /// Problem details the API attaches to partial or failed lookups
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// Pagination metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    /// Cursor for the next page; absent on the last page
    pub next_token: Option<String>,

    pub result_count: Option<u64>,
}

/// Retry budget and backoff for transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for every further retry
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base * 2u32.pow(exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
        }
    }
}

/// Builds the HTTP client used for API requests
///
/// # Arguments
///
/// * `config` - The API configuration (timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Authenticated HTTP transport with automatic retry
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Decode payload |
/// | HTTP 5xx | Retry with backoff, then `Transient` |
/// | Timeout / connection failure | Retry with backoff, then `Transient` |
/// | Other HTTP status | Immediate `Client` error |
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    bearer_token: String,
    retry: RetryPolicy,
    attempts: AtomicU64,
}

impl HttpTransport {
    /// Creates a transport for the configured API
    ///
    /// # Arguments
    ///
    /// * `config` - API settings (base URL, timeouts)
    /// * `bearer_token` - Credential sent with every request
    /// * `retry` - Retry budget for transient failures
    pub fn new(
        config: &ApiConfig,
        bearer_token: &str,
        retry: RetryPolicy,
    ) -> Result<Self, TransportError> {
        // Fail early on a malformed base URL rather than on the first request
        Url::parse(&config.base_url)?;

        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
            retry,
            attempts: AtomicU64::new(0),
        })
    }

    /// Total HTTP attempts made so far, retries included
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))
    }

    /// Sends one GET request and decodes the page
    ///
    /// # Arguments
    ///
    /// * `path` - Path relative to the base URL, e.g. `users/12/following`
    /// * `query` - Query parameters
    pub async fn send(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiPage, TransportError> {
        let url = self.endpoint(path)?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.attempts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("GET {} (attempt {})", url, attempt);

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.bearer_token)
                .query(query)
                .send()
                .await;

            let (status, message) = match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.bytes().await?;
                        return Ok(serde_json::from_slice(&body)?);
                    }
                    if !status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(TransportError::Client {
                            status: status.as_u16(),
                            body: truncate(&body, 200),
                        });
                    }
                    (Some(status), format!("HTTP {}", status.as_u16()))
                }
                Err(e) if e.is_timeout() || e.is_connect() => (None, e.to_string()),
                Err(e) => return Err(e.into()),
            };

            if attempt >= self.retry.max_attempts {
                return Err(TransportError::Transient {
                    status: status.map(|s: StatusCode| s.as_u16()),
                    attempts: attempt,
                    message,
                });
            }

            let delay = self.retry.backoff_for(attempt);
            tracing::warn!(
                "{} for {}; retrying in {:?} (attempt {}/{})",
                message,
                url.path(),
                delay,
                attempt,
                self.retry.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}
