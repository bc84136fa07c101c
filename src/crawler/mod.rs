//! Crawler module for follow-graph expansion
//!
//! This module contains the core crawling logic, including:
//! - Request-rate governance shared by every fetch
//! - HTTP transport with retry for transient failures
//! - Paginated edge-set fetching with an in-process cache
//! - Level-by-level crawl coordination

mod cache;
mod coordinator;
mod fetcher;
mod governor;
mod transport;

pub use cache::{EdgeSetCache, EdgeSetKey};
pub use coordinator::{Coordinator, CrawlSettings, CrawlSummary, Denylist, ProgressCallback};
pub use fetcher::{EdgeFetcher, FetchError, FetchOptions, FetchedEdges, USER_FIELDS};
pub use governor::RateGovernor;
pub use transport::{
    build_http_client, ApiPage, HttpTransport, PageMeta, RetryPolicy, TransportError,
};

use crate::config::Config;
use crate::storage::RunStore;
use std::sync::Arc;

/// Wires a fetcher for one run from configuration
///
/// This is the main entry point for building the crawl pipeline. It will:
/// 1. Check that a bearer token is configured
/// 2. Build the rate governor from the quota settings
/// 3. Build the transport with the configured retry budget
/// 4. Attach a fresh in-process cache
///
/// # Arguments
///
/// * `config` - The effective configuration
/// * `store` - Run store for the run being crawled
///
/// # Returns
///
/// * `Ok(EdgeFetcher)` - Ready to fetch
/// * `Err(FollownetError)` - Missing credential or unusable API settings
pub fn build_fetcher(config: &Config, store: Arc<dyn RunStore>) -> crate::Result<EdgeFetcher> {
    let token = config.bearer_token()?;
    let governor = Arc::new(RateGovernor::from_config(&config.rate_limit));
    let transport = Arc::new(HttpTransport::new(
        &config.api,
        token,
        RetryPolicy::from_config(&config.retry),
    )?);

    Ok(EdgeFetcher::new(
        transport,
        governor,
        store,
        Arc::new(EdgeSetCache::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonlRunStore;
    use crate::{ConfigError, FollownetError};
    use tempfile::TempDir;

    #[test]
    fn test_build_fetcher_requires_token() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlRunStore::open(dir.path(), "run"));
        let result = build_fetcher(&Config::default(), store);
        assert!(matches!(
            result,
            Err(FollownetError::Config(ConfigError::MissingCredential(_)))
        ));
    }

    #[test]
    fn test_build_fetcher_with_token() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlRunStore::open(dir.path(), "run"));
        let mut config = Config::default();
        config.api.bearer_token = Some("secret".to_string());

        let fetcher = build_fetcher(&config, store).unwrap();
        assert_eq!(fetcher.requests_made(), 0);
        assert_eq!(fetcher.store().run_id(), "run");
    }
}
