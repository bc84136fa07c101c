//! Output module for summarizing and exporting crawl runs
//!
//! This module handles:
//! - Computing, printing and saving run statistics (`crawl_stats.json`)
//! - Exporting a run's edge-sets into an SQLite table file (`users.db`)
//!
//! Both read the run only through the `RunStore` trait.

pub mod stats;
mod table;

pub use stats::{
    compute_statistics, print_statistics, save_statistics, EdgeSetSize, RunStatistics, STATS_FILE,
};
pub use table::{
    export_to_connection, export_users_db, initialize_schema, ExportSummary, USERS_DB_FILE,
};

use thiserror::Error;

/// Errors that can occur while producing derived outputs
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to read run: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
