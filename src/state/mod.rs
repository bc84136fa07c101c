//! State module for the follow graph
//!
//! This module provides the value types that flow through a crawl.
//!
//! # Components
//!
//! - `NodeId`: A validated account identifier (graph vertex key)
//! - `EdgeDirection`: Which relationship is expanded (`following` or `followers`)
//! - `UserRecord`: One neighbor user object as returned by the API
//! - `NodeOutcome`: The per-node result reported to callers (cached, fetched, empty, failed)

mod node;
mod outcome;

// Re-export main types
pub use node::{EdgeDirection, NodeId, UserRecord};
pub use outcome::{NodeOutcome, NodeReport};
