//! Storage module for persisting crawl runs
//!
//! This module handles everything written to disk during a crawl:
//! - One edge-set record per (node, direction) pair, as newline-delimited JSON
//! - Atomic writes (temp file + rename) so records are never seen half-written
//! - The run manifest used to resume an interrupted run

mod jsonl;
mod manifest;
mod traits;

pub use jsonl::JsonlRunStore;
pub(crate) use jsonl::write_atomic;
pub use manifest::{default_run_id, run_id_for_today, RunManifest, RunStatus};
pub use traits::{RunStore, StorageError, StorageResult};

use crate::state::{EdgeDirection, NodeId};
use std::path::Path;

/// Opens the run store for a run under the given base directory
///
/// # Arguments
///
/// * `data_path` - Base output directory
/// * `run_id` - Run identifier
///
/// # Returns
///
/// The store; the run directory is created lazily on first write.
pub fn open_run(data_path: &Path, run_id: &str) -> JsonlRunStore {
    JsonlRunStore::open(data_path, run_id)
}

/// Opens a run and reconciles its manifest with the run about to start
///
/// A new manifest is created for a fresh run directory. For an existing one the
/// stored manifest is switched back to `running`; a changed configuration hash
/// is logged but does not prevent resuming.
pub fn begin_run(
    store: &JsonlRunStore,
    seed: &NodeId,
    direction: EdgeDirection,
    max_depth: u32,
    config_hash: &str,
) -> StorageResult<RunManifest> {
    let manifest = match store.load_manifest()? {
        Some(mut existing) => {
            tracing::info!(
                "Resuming run {} (previous status: {})",
                existing.run_id,
                existing.status.as_str()
            );
            if existing.config_hash != config_hash {
                tracing::warn!(
                    "Configuration changed since run {} started (was {}, now {})",
                    existing.run_id,
                    existing.config_hash,
                    config_hash
                );
                existing.config_hash = config_hash.to_string();
            }
            if existing.direction != direction {
                tracing::warn!(
                    "Run {} was started for '{}' edges; now crawling '{}'",
                    existing.run_id,
                    existing.direction,
                    direction
                );
            }
            existing.max_depth = max_depth;
            existing.resume();
            existing
        }
        None => {
            tracing::info!("Starting new run {}", store.run_id());
            RunManifest::start(store.run_id(), seed.clone(), direction, max_depth, config_hash)
        }
    };

    store.save_manifest(&manifest)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed() -> NodeId {
        NodeId::parse("12").unwrap()
    }

    #[test]
    fn test_begin_run_creates_manifest() {
        let dir = TempDir::new().unwrap();
        let store = open_run(dir.path(), "12_20240101");
        assert!(store.load_manifest().unwrap().is_none());

        let manifest = begin_run(&store, &seed(), EdgeDirection::Following, 2, "h1").unwrap();
        assert_eq!(manifest.run_id, "12_20240101");
        assert_eq!(manifest.status, RunStatus::Running);
        assert_eq!(store.load_manifest().unwrap(), Some(manifest));
    }

    #[test]
    fn test_begin_run_resumes_existing() {
        let dir = TempDir::new().unwrap();
        let store = open_run(dir.path(), "run");

        let mut first = begin_run(&store, &seed(), EdgeDirection::Following, 2, "h1").unwrap();
        first.finish(RunStatus::Interrupted);
        store.save_manifest(&first).unwrap();

        let resumed = begin_run(&store, &seed(), EdgeDirection::Following, 3, "h2").unwrap();
        assert_eq!(resumed.status, RunStatus::Running);
        assert_eq!(resumed.started_at, first.started_at);
        assert_eq!(resumed.config_hash, "h2");
        assert_eq!(resumed.max_depth, 3);
        assert!(resumed.finished_at.is_none());
    }
}
