//! Crawl coordinator - level-by-level expansion of the follow graph
//!
//! This module contains the main crawl loop, including:
//! - Expanding the frontier one depth level at a time up to the hop ceiling
//! - Skipping denylisted and already-expanded nodes
//! - Running node fetches concurrently within a level
//! - Reporting every node outcome and aggregating the run summary
//! - Stopping cleanly on cancellation

use crate::config::Config;
use crate::crawler::fetcher::{EdgeFetcher, FetchOptions};
use crate::state::{EdgeDirection, NodeId, NodeOutcome, NodeReport};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked once for every expanded node
pub type ProgressCallback = Box<dyn Fn(&NodeReport) + Send + Sync>;

/// Predicate returning true for nodes that must never be fetched
pub type Denylist = Box<dyn Fn(&NodeId) -> bool + Send + Sync>;

/// Settings for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Relationship expanded for every node
    pub direction: EdgeDirection,

    /// Hop ceiling: nodes at this depth are discovered but never expanded
    pub max_depth: u32,

    /// Node fetches kept in flight within one level
    pub workers: usize,

    /// Options passed to every fetch
    pub fetch: FetchOptions,
}

impl CrawlSettings {
    /// Builds crawl settings from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The effective configuration
    /// * `resume` - Whether stored edge-sets may be reused
    pub fn from_config(config: &Config, resume: bool) -> Self {
        Self {
            direction: config.crawler.edge,
            max_depth: config.crawler.max_depth,
            workers: config.crawler.workers as usize,
            fetch: FetchOptions {
                resume,
                stop_at: None,
                page_size: config.api.page_size,
            },
        }
    }
}

/// Aggregate result of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Sum of neighbor counts over every expanded node
    pub crawled_count: u64,

    /// Nodes that produced a report
    pub nodes_expanded: u64,

    pub cached: u64,
    pub fetched: u64,
    pub empty: u64,
    pub failed: u64,

    /// Nodes dropped before fetching (denylisted or already expanded)
    pub skipped: u64,

    /// Deepest depth whose nodes were discovered
    pub depth_reached: u32,

    /// True if the crawl stopped because of cancellation
    pub cancelled: bool,
}

impl CrawlSummary {
    fn record(&mut self, report: &NodeReport) {
        self.nodes_expanded += 1;
        self.crawled_count += report.edge_count() as u64;
        match report.outcome {
            NodeOutcome::Cached => self.cached += 1,
            NodeOutcome::Fetched => self.fetched += 1,
            NodeOutcome::Empty => self.empty += 1,
            NodeOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Main crawl coordinator
///
/// The set of expanded (node, direction) pairs lives as long as the
/// coordinator, so a node reached through several parents, or again in a
/// later `crawl` call, is expanded and counted only once.
pub struct Coordinator {
    fetcher: Arc<EdgeFetcher>,
    settings: CrawlSettings,
    denylist: Option<Denylist>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
    expanded: HashSet<(NodeId, EdgeDirection)>,
    crawled_count: u64,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Edge fetcher bound to the run being crawled
    /// * `settings` - Direction, hop ceiling, concurrency and fetch options
    pub fn new(fetcher: Arc<EdgeFetcher>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            settings,
            denylist: None,
            progress: None,
            cancel: CancellationToken::new(),
            expanded: HashSet::new(),
            crawled_count: 0,
        }
    }

    /// Sets the predicate deciding which nodes are never fetched
    pub fn with_denylist<F>(mut self, denylist: F) -> Self
    where
        F: Fn(&NodeId) -> bool + Send + Sync + 'static,
    {
        self.denylist = Some(Box::new(denylist));
        self
    }

    /// Sets the callback receiving every node report
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&NodeReport) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Sets the token used to stop the crawl early
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Total neighbor count over every node expanded by this coordinator
    pub fn crawled_count(&self) -> u64 {
        self.crawled_count
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawls outward from a single seed at depth 0
    pub async fn crawl_from(&mut self, seed: NodeId) -> CrawlSummary {
        self.crawl(vec![seed], 0).await
    }

    /// Expands the given nodes and their descendants up to the hop ceiling
    ///
    /// # Arguments
    ///
    /// * `node_ids` - Nodes at `current_depth`
    /// * `current_depth` - Depth of `node_ids`; nothing happens at or past the ceiling
    ///
    /// # Returns
    ///
    /// Summary of this call only; `crawled_count()` keeps the running total.
    pub async fn crawl(&mut self, node_ids: Vec<NodeId>, current_depth: u32) -> CrawlSummary {
        let direction = self.settings.direction;
        let workers = self.settings.workers.max(1);
        let mut summary = CrawlSummary {
            depth_reached: current_depth,
            ..CrawlSummary::default()
        };

        let mut frontier = node_ids;
        let mut depth = current_depth;

        while depth < self.settings.max_depth && !frontier.is_empty() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let mut batch = Vec::with_capacity(frontier.len());
            for node in frontier {
                if self.denylist.as_ref().is_some_and(|denied| denied(&node)) {
                    tracing::debug!("Skipping denylisted user {}", node);
                    summary.skipped += 1;
                    continue;
                }
                if !self.expanded.insert((node.clone(), direction)) {
                    tracing::debug!("User {} already expanded", node);
                    summary.skipped += 1;
                    continue;
                }
                batch.push(node);
            }

            tracing::info!("Crawler at depth {}: expanding {} users", depth, batch.len());

            let fetcher = self.fetcher.as_ref();
            let options = &self.settings.fetch;
            let cancel = &self.cancel;
            let progress = self.progress.as_deref();

            let reports: Vec<Option<NodeReport>> = stream::iter(batch.iter())
                .map(move |node| async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        report = fetcher.fetch_and_persist(node, direction, depth, options) => {
                            tracing::info!(
                                "Depth {}: {} {} users for user {} ({})",
                                depth,
                                report.outcome,
                                report.edge_count(),
                                report.node,
                                direction
                            );
                            if let Some(progress) = progress {
                                progress(&report);
                            }
                            Some(report)
                        }
                    }
                })
                .buffered(workers)
                .collect()
                .await;

            let mut next = Vec::new();
            for (node, report) in batch.into_iter().zip(reports) {
                match report {
                    Some(report) => {
                        summary.record(&report);
                        self.crawled_count += report.edge_count() as u64;
                        next.extend(report.neighbors);
                    }
                    // Abandoned before its record was written; eligible again later
                    None => {
                        self.expanded.remove(&(node, direction));
                    }
                }
            }

            if self.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled at depth {}", depth);
                summary.cancelled = true;
                break;
            }

            frontier = next;
            depth += 1;
            summary.depth_reached = depth;
        }

        tracing::info!(
            "Crawl finished: {} users crawled, {} expanded ({} fetched, {} cached, {} empty, {} failed)",
            summary.crawled_count,
            summary.nodes_expanded,
            summary.fetched,
            summary.cached,
            summary.empty,
            summary.failed
        );

        summary
    }
}
