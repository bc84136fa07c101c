//! Per-node outcome definitions for crawl reporting
//!
//! Every node the controller expands yields exactly one outcome.

use crate::state::{EdgeDirection, NodeId};
use std::fmt;

/// Represents how an edge-set was resolved for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    // ===== Success States =====
    /// Edge-set was already present (in-process cache or run store); no network calls
    Cached,

    /// Edge-set was fetched from the API and written to the run store
    Fetched,

    // ===== Terminal Non-Failure States =====
    /// Account could not be retrieved (suspended, protected, not found)
    Empty,

    // ===== Error States =====
    /// Fetch or storage failed for this node; the rest of the crawl continues
    Failed { reason: String },
}

impl NodeOutcome {
    /// Returns true if the edge-set is available (cached or fetched)
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Cached | Self::Fetched)
    }

    /// Returns true if this represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the short label used in logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Fetched => "fetched",
            Self::Empty => "empty",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Report emitted once for each expanded node
#[derive(Debug, Clone)]
pub struct NodeReport {
    /// The node that was expanded
    pub node: NodeId,

    /// The relationship that was expanded
    pub direction: EdgeDirection,

    /// Depth of the node (the seed is at depth 0)
    pub depth: u32,

    /// How the edge-set was resolved
    pub outcome: NodeOutcome,

    /// Neighbor IDs in API order; empty for `Empty` and `Failed`
    pub neighbors: Vec<NodeId>,
}

impl NodeReport {
    /// Number of edges retrieved for this node
    pub fn edge_count(&self) -> usize {
        self.neighbors.len()
    }
}
