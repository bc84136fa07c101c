//! Follownet: a resumable follow-graph crawler
//!
//! This crate walks the follow graph of a social API outward from a seed account,
//! fetching each visited account's `following` or `followers` list page by page
//! while staying inside the provider's request quota. Every fetched edge-set is
//! written to a per-run directory so an interrupted crawl picks up where it left off.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Follownet operations
#[derive(Debug, Error)]
pub enum FollownetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] crawler::TransportError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
///
/// These are raised before any network activity and are never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid user ID '{0}': must be a non-empty string of decimal digits")]
    InvalidNodeId(String),

    #[error("Invalid edge direction '{0}': must be one of following, followers")]
    InvalidDirection(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Follownet operations
pub type Result<T> = std::result::Result<T, FollownetError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary, EdgeFetcher, HttpTransport, RateGovernor};
pub use state::{EdgeDirection, NodeId, NodeOutcome, UserRecord};
pub use storage::{JsonlRunStore, RunStore};
