//! In-process edge-set cache
//!
//! This module keeps every edge-set resolved during the current process so a
//! node reached again is answered without touching the run store or the API.
//! Entries never expire; the cache lives as long as the fetcher that owns it.

use crate::state::{EdgeDirection, NodeId, UserRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Cache key: one edge-set of one node within one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeSetKey {
    pub run_id: String,
    pub node: NodeId,
    pub direction: EdgeDirection,
}

impl EdgeSetKey {
    pub fn new(run_id: &str, node: &NodeId, direction: EdgeDirection) -> Self {
        Self {
            run_id: run_id.to_string(),
            node: node.clone(),
            direction,
        }
    }
}

/// Thread-safe map from (run, node, direction) to its edge-set
///
/// Edge-sets are stored behind an `Arc` so a hit hands out the records
/// without copying them.
#[derive(Debug, Default)]
pub struct EdgeSetCache {
    entries: Mutex<HashMap<EdgeSetKey, Arc<Vec<UserRecord>>>>,
}

impl EdgeSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a cached edge-set
    pub fn get(&self, key: &EdgeSetKey) -> Option<Arc<Vec<UserRecord>>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores an edge-set, replacing any previous entry for the key
    pub fn insert(&self, key: EdgeSetKey, records: Arc<Vec<UserRecord>>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, records);
    }

    pub fn contains(&self, key: &EdgeSetKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
