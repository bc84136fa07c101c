//! Storage traits and error types
//!
//! This module defines the trait interface for run store backends and
//! associated error types.

use crate::state::{EdgeDirection, NodeId, UserRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Edge-set not found for {node} ({direction})")]
    NotFound {
        node: NodeId,
        direction: EdgeDirection,
    },

    #[error("Corrupt record in {path} at line {line}: {source}")]
    Corrupt {
        path: String,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run store implementations
///
/// A run store maps (node, direction) to the edge-set fetched for that pair
/// within one run. Records are written once; callers decide whether an
/// existing record may be replaced. Implementations assume a single writer per run.
pub trait RunStore: Send + Sync {
    /// Identifier of the run this store belongs to
    fn run_id(&self) -> &str;

    /// Checks whether an edge-set has been stored for this pair
    fn exists(&self, node: &NodeId, direction: EdgeDirection) -> StorageResult<bool>;

    /// Reads a stored edge-set in API order
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UserRecord>)` - The stored records (possibly empty)
    /// * `Err(StorageError::NotFound)` - Nothing has been stored for this pair
    fn read(&self, node: &NodeId, direction: EdgeDirection) -> StorageResult<Vec<UserRecord>>;

    /// Writes an edge-set, replacing any existing record
    ///
    /// The write must be atomic: readers see either the old record or the new
    /// one, never a partial file. Parent locations are created on demand.
    fn write(
        &self,
        node: &NodeId,
        direction: EdgeDirection,
        records: &[UserRecord],
    ) -> StorageResult<()>;

    /// Lists every stored (node, direction) pair
    fn list(&self) -> StorageResult<Vec<(NodeId, EdgeDirection)>>;
}
