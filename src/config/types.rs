use crate::state::{EdgeDirection, NodeId};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main configuration structure for Follownet
///
/// Every section and field has a default, so an empty file (or no file at all)
/// is a valid starting point that environment variables and CLI flags refine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Returns the bearer token, or a configuration error if none is set
    pub fn bearer_token(&self) -> ConfigResult<&str> {
        match self.api.bearer_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConfigError::MissingCredential(
                "set FOLLOWNET_BEARER_TOKEN or api.bearer-token".to_string(),
            )),
        }
    }

    /// Returns the validated seed user ID
    pub fn seed_user_id(&self) -> ConfigResult<NodeId> {
        match self.crawler.seed_user_id.as_deref() {
            Some(id) => NodeId::parse(id),
            None => Err(ConfigError::Validation(
                "seed user ID must be set via --user-id, FOLLOWNET_SEED_USER_ID or crawler.seed-user-id"
                    .to_string(),
            )),
        }
    }

    /// Returns the denylist as a set of validated node IDs
    pub fn denylist(&self) -> ConfigResult<HashSet<NodeId>> {
        self.crawler
            .denylist
            .iter()
            .map(|id| NodeId::parse(id))
            .collect()
    }
}

/// Provider API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Bearer token sent with every request (never serialized)
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,

    /// Base URL of the API, without trailing path segments for users
    pub base_url: String,

    /// Records requested per page (the API allows at most 1000)
    pub page_size: u32,

    /// Total request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: "https://api.twitter.com/2".to_string(),
            page_size: 1000,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Account to start the crawl at
    pub seed_user_id: Option<String>,

    /// Relationship to expand for every node
    pub edge: EdgeDirection,

    /// Maximum number of hops from the seed
    pub max_depth: u32,

    /// Number of node fetches kept in flight within one depth level
    pub workers: u32,

    /// Node IDs that are never fetched
    pub denylist: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_user_id: None,
            edge: EdgeDirection::Following,
            max_depth: 3,
            workers: 4,
            denylist: Vec::new(),
        }
    }
}

/// Request quota configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,

    /// Extra seconds added to the window to absorb clock skew
    pub tolerance_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 15,
            window_secs: 15 * 60,
            tolerance_secs: 5,
        }
    }
}

/// Transport retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Backoff before the first retry, in milliseconds; doubles per attempt
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 100,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory holding one subdirectory per run
    pub data_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_path: base.join("follownet_data"),
        }
    }
}

/// Values supplied on the command line, applied after the file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed_user_id: Option<String>,
    pub edge: Option<String>,
    pub max_depth: Option<u32>,
    pub workers: Option<u32>,
    pub data_path: Option<PathBuf>,
}
