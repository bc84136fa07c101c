//! Run manifest: identity and status of one crawl run

use crate::state::{EdgeDirection, NodeId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Represents a crawl run, persisted as `run.json` in the run directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub seed: NodeId,
    pub direction: EdgeDirection,
    pub max_depth: u32,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
}

impl RunManifest {
    /// Creates a manifest for a run that is starting now
    pub fn start(
        run_id: &str,
        seed: NodeId,
        direction: EdgeDirection,
        max_depth: u32,
        config_hash: &str,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            seed,
            direction,
            max_depth,
            config_hash: config_hash.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
        }
    }

    /// Marks the run as resumed: status back to running, finish time cleared
    pub fn resume(&mut self) {
        self.status = RunStatus::Running;
        self.finished_at = None;
    }

    /// Records the final status with a finish timestamp
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Derives the default run ID for a seed: `{seed}_{YYYYMMDD}`
pub fn default_run_id(seed: &NodeId, date: NaiveDate) -> String {
    format!("{}_{}", seed, date.format("%Y%m%d"))
}

/// Derives the default run ID for a seed using today's local date
pub fn run_id_for_today(seed: &NodeId) -> String {
    default_run_id(seed, chrono::Local::now().date_naive())
}
