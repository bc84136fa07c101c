//! Edge-set fetcher
//!
//! This module resolves the neighbor list of one node, including:
//! - Answering from the in-process cache or the run store when resuming
//! - Walking the paginated API response under the shared rate governor
//! - Stopping early at an optional record limit
//! - Persisting the result and converting failures into per-node outcomes

use crate::config::MAX_PAGE_SIZE;
use crate::crawler::cache::{EdgeSetCache, EdgeSetKey};
use crate::crawler::governor::RateGovernor;
use crate::crawler::transport::{HttpTransport, TransportError};
use crate::state::{EdgeDirection, NodeId, NodeOutcome, NodeReport, UserRecord};
use crate::storage::{RunStore, StorageError, StorageResult};
use std::sync::Arc;
use thiserror::Error;

/// User fields requested for every neighbor
pub const USER_FIELDS: &[&str] = &[
    "created_at",
    "description",
    "entities",
    "id",
    "location",
    "name",
    "pinned_tweet_id",
    "profile_image_url",
    "protected",
    "public_metrics",
    "url",
    "username",
    "verified",
    "withheld",
];

/// Errors that abort the resolution of one edge-set
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Per-fetch options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Reuse edge-sets already cached or stored for this run
    pub resume: bool,

    /// Stop after this many records; `None` fetches the whole list
    pub stop_at: Option<usize>,

    /// Records requested per page, clamped to the API maximum
    pub page_size: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            resume: true,
            stop_at: None,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// A resolved edge-set
#[derive(Debug, Clone)]
pub struct FetchedEdges {
    /// Neighbor records in API order
    pub records: Arc<Vec<UserRecord>>,

    /// `Cached`, `Fetched` or `Empty`
    pub outcome: NodeOutcome,
}

impl FetchedEdges {
    fn new(records: Vec<UserRecord>, outcome: NodeOutcome) -> Self {
        Self {
            records: Arc::new(records),
            outcome,
        }
    }

    /// Neighbor IDs in API order
    pub fn neighbor_ids(&self) -> Vec<NodeId> {
        self.records.iter().map(|record| record.id.clone()).collect()
    }
}

/// Fetches and stores edge-sets for one run
///
/// The fetcher owns no global state: the governor, the store and the cache
/// are handed in so several fetchers (or tests) can share or isolate them.
pub struct EdgeFetcher {
    transport: Arc<HttpTransport>,
    governor: Arc<RateGovernor>,
    store: Arc<dyn RunStore>,
    cache: Arc<EdgeSetCache>,
}

impl EdgeFetcher {
    pub fn new(
        transport: Arc<HttpTransport>,
        governor: Arc<RateGovernor>,
        store: Arc<dyn RunStore>,
        cache: Arc<EdgeSetCache>,
    ) -> Self {
        Self {
            transport,
            governor,
            store,
            cache,
        }
    }

    /// The run store this fetcher writes to
    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Total HTTP attempts made through this fetcher's transport
    pub fn requests_made(&self) -> u64 {
        self.transport.attempts()
    }

    fn cache_key(&self, node: &NodeId, direction: EdgeDirection) -> EdgeSetKey {
        EdgeSetKey::new(self.store.run_id(), node, direction)
    }

    /// Resolves the edge-set of a node
    ///
    /// # Arguments
    ///
    /// * `node` - The node to expand
    /// * `direction` - Relationship to follow
    /// * `options` - Resume, record limit and page size
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedEdges)` - Records with `Cached`, `Fetched` or `Empty` outcome
    /// * `Err(FetchError)` - A request or store read failed
    pub async fn fetch(
        &self,
        node: &NodeId,
        direction: EdgeDirection,
        options: &FetchOptions,
    ) -> Result<FetchedEdges, FetchError> {
        if options.resume {
            let key = self.cache_key(node, direction);
            if let Some(records) = self.cache.get(&key) {
                tracing::debug!("Cache hit for {} ({})", node, direction);
                return Ok(FetchedEdges {
                    records,
                    outcome: NodeOutcome::Cached,
                });
            }
            if self.store.exists(node, direction)? {
                tracing::debug!("Run store hit for {} ({})", node, direction);
                let records = Arc::new(self.store.read(node, direction)?);
                self.cache.insert(key, records.clone());
                return Ok(FetchedEdges {
                    records,
                    outcome: NodeOutcome::Cached,
                });
            }
        }

        if options.stop_at == Some(0) {
            return Ok(FetchedEdges::new(Vec::new(), NodeOutcome::Fetched));
        }

        let path = format!("users/{}/{}", node, direction);
        let page_size = options.page_size.clamp(1, MAX_PAGE_SIZE) as usize;
        let user_fields = USER_FIELDS.join(",");
        let mut records: Vec<UserRecord> = Vec::new();
        let mut pagination_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let max_results = match options.stop_at {
                Some(limit) => page_size.min(limit.saturating_sub(records.len())),
                None => page_size,
            };

            let mut query = vec![
                ("max_results", max_results.to_string()),
                ("user.fields", user_fields.clone()),
            ];
            if let Some(token) = &pagination_token {
                query.push(("pagination_token", token.clone()));
            }

            self.governor.acquire().await;
            let page = self.transport.send(&path, &query).await?;
            pages += 1;

            let Some(data) = page.data else {
                if records.is_empty() {
                    tracing::info!(
                        "No {} data for user {}; treating as unretrievable",
                        direction,
                        node
                    );
                    return Ok(FetchedEdges::new(Vec::new(), NodeOutcome::Empty));
                }
                tracing::warn!(
                    "Page {} for user {} ({}) has no data; keeping {} records from earlier pages",
                    pages,
                    node,
                    direction,
                    records.len()
                );
                break;
            };

            tracing::debug!(
                "Page {} for user {} ({}): {} records",
                pages,
                node,
                direction,
                data.len()
            );
            records.extend(data);

            if let Some(limit) = options.stop_at {
                if records.len() >= limit {
                    records.truncate(limit);
                    break;
                }
            }

            match page.meta.next_token {
                Some(token) => pagination_token = Some(token),
                None => break,
            }
        }

        Ok(FetchedEdges::new(records, NodeOutcome::Fetched))
    }

    /// Writes an edge-set to the run store
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record was written
    /// * `Ok(false)` - A record already existed and `force` was not set
    pub fn persist(
        &self,
        node: &NodeId,
        direction: EdgeDirection,
        records: &[UserRecord],
        force: bool,
    ) -> StorageResult<bool> {
        if !force && self.store.exists(node, direction)? {
            tracing::debug!("Keeping existing record for {} ({})", node, direction);
            return Ok(false);
        }
        self.store.write(node, direction, records)?;
        Ok(true)
    }

    /// Fetches, persists and caches one edge-set, reporting the outcome
    ///
    /// Errors never escape: they become `NodeOutcome::Failed` so the caller
    /// can carry on with the rest of the crawl.
    pub async fn fetch_and_persist(
        &self,
        node: &NodeId,
        direction: EdgeDirection,
        depth: u32,
        options: &FetchOptions,
    ) -> NodeReport {
        let result = async {
            let fetched = self.fetch(node, direction, options).await?;
            if fetched.outcome != NodeOutcome::Cached {
                self.persist(node, direction, &fetched.records, !options.resume)?;
                self.cache
                    .insert(self.cache_key(node, direction), fetched.records.clone());
            }
            Ok::<_, FetchError>(fetched)
        }
        .await;

        let (outcome, neighbors) = match result {
            Ok(fetched) => {
                let neighbors = fetched.neighbor_ids();
                (fetched.outcome, neighbors)
            }
            Err(e) => {
                tracing::warn!("Failed to expand user {} ({}): {}", node, direction, e);
                (
                    NodeOutcome::Failed {
                        reason: e.to_string(),
                    },
                    Vec::new(),
                )
            }
        };

        NodeReport {
            node: node.clone(),
            direction,
            depth,
            outcome,
            neighbors,
        }
    }
}
