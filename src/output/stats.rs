//! Statistics generation from a run store
//!
//! This module provides functionality for extracting, displaying and
//! saving summary statistics of a crawl run.

use crate::output::OutputResult;
use crate::state::{EdgeDirection, NodeId};
use crate::storage::{write_atomic, RunStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the saved statistics inside a run directory
pub const STATS_FILE: &str = "crawl_stats.json";

/// Number of largest edge-sets listed in the statistics
const TOP_EDGE_SETS: usize = 10;

/// Size of one stored edge-set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSetSize {
    pub node: NodeId,
    pub direction: EdgeDirection,
    pub edges: u64,
}

/// Run statistics summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_id: String,

    /// Number of stored edge-sets (expanded nodes)
    pub edge_sets: u64,

    /// Edge-sets with no neighbors (includes unretrievable accounts)
    pub empty_edge_sets: u64,

    /// Total neighbor records over every edge-set
    pub total_edges: u64,

    /// Distinct neighbor IDs over every edge-set
    pub unique_users: u64,

    /// Total edges per direction label
    pub edges_by_direction: BTreeMap<String, u64>,

    /// Largest edge-sets, biggest first
    pub largest_edge_sets: Vec<EdgeSetSize>,

    pub computed_at: DateTime<Utc>,
}

/// Computes statistics over every edge-set in a run
///
/// # Arguments
///
/// * `store` - The run store to read
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully computed statistics
/// * `Err(OutputError)` - A stored record could not be read
pub fn compute_statistics(store: &dyn RunStore) -> OutputResult<RunStatistics> {
    let mut empty_edge_sets = 0;
    let mut total_edges = 0;
    let mut unique = HashSet::new();
    let mut edges_by_direction = BTreeMap::new();
    let mut sizes = Vec::new();

    let pairs = store.list()?;
    for (node, direction) in &pairs {
        let records = store.read(node, *direction)?;
        let edges = records.len() as u64;

        if edges == 0 {
            empty_edge_sets += 1;
        }
        total_edges += edges;
        *edges_by_direction
            .entry(direction.to_string())
            .or_insert(0) += edges;
        unique.extend(records.into_iter().map(|record| record.id));
        sizes.push(EdgeSetSize {
            node: node.clone(),
            direction: *direction,
            edges,
        });
    }

    // Biggest first; ties keep the store's listing order
    sizes.sort_by(|a, b| b.edges.cmp(&a.edges));
    sizes.truncate(TOP_EDGE_SETS);

    Ok(RunStatistics {
        run_id: store.run_id().to_string(),
        edge_sets: pairs.len() as u64,
        empty_edge_sets,
        total_edges,
        unique_users: unique.len() as u64,
        edges_by_direction,
        largest_edge_sets: sizes,
        computed_at: Utc::now(),
    })
}

/// Saves statistics as pretty-printed JSON into the run directory
///
/// # Returns
///
/// The path of the written file.
pub fn save_statistics(stats: &RunStatistics, run_dir: &Path) -> OutputResult<PathBuf> {
    let path = run_dir.join(STATS_FILE);
    let content = serde_json::to_vec_pretty(stats)?;
    write_atomic(&path, |writer| {
        writer.write_all(&content)?;
        Ok(())
    })?;
    Ok(path)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics: {} ===\n", stats.run_id);

    println!("Overview:");
    println!("  Edge-sets stored: {}", stats.edge_sets);
    println!("  Empty edge-sets: {}", stats.empty_edge_sets);
    println!("  Total edges: {}", stats.total_edges);
    println!("  Unique users: {}", stats.unique_users);
    println!();

    if !stats.edges_by_direction.is_empty() {
        println!("Edges by Direction:");
        for (direction, count) in &stats.edges_by_direction {
            println!("  {}: {}", direction, count);
        }
        println!();
    }

    if !stats.largest_edge_sets.is_empty() {
        println!("Largest Edge-Sets:");
        for size in &stats.largest_edge_sets {
            println!("  {} ({}): {}", size.node, size.direction, size.edges);
        }
        println!();
    }

    let average = if stats.edge_sets > 0 {
        stats.total_edges as f64 / stats.edge_sets as f64
    } else {
        0.0
    };
    println!("Average edges per user: {:.1}", average);
}
