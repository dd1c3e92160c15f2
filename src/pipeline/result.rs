//! Per-object outcomes and the run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::model::BucketObject;
use crate::sink::OutputTarget;

/// Processing stage of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovered,
    Fetching,
    Compressing,
    Writing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Discovered => "discovered",
            Stage::Fetching => "fetching",
            Stage::Compressing => "compressing",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// How one object ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success {
        bytes_before: u64,
        bytes_after: u64,
        images_recompressed: usize,
        /// False when an unchanged document was not uploaded again
        written: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    Failure {
        /// Stage at which processing stopped
        stage: Stage,
        kind: ErrorKind,
        reason: String,
    },
}

/// Final result for one discovered object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectOutcome {
    pub object: BucketObject,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ObjectOutcome {
    /// Record a failure at `stage`.
    pub fn failure(object: BucketObject, stage: Stage, error: &Error) -> Self {
        Self {
            object,
            status: OutcomeStatus::Failure {
                stage,
                kind: error.kind(),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    /// The stage the object stopped at: `Done` for successes.
    pub fn final_stage(&self) -> Stage {
        match &self.status {
            OutcomeStatus::Success { .. } => Stage::Done,
            OutcomeStatus::Failure { stage, .. } => *stage,
        }
    }
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Objects discovered and processed
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successes that needed no write
    pub unchanged: usize,
    /// Input bytes of successful objects
    pub bytes_before: u64,
    /// Output bytes of successful objects
    pub bytes_after: u64,
}

impl RunSummary {
    /// Summarize a list of outcomes.
    pub fn from_outcomes(outcomes: &[ObjectOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match &outcome.status {
                OutcomeStatus::Success {
                    bytes_before,
                    bytes_after,
                    written,
                    ..
                } => {
                    summary.succeeded += 1;
                    summary.bytes_before += bytes_before;
                    summary.bytes_after += bytes_after;
                    if !written {
                        summary.unchanged += 1;
                    }
                }
                OutcomeStatus::Failure { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Bytes saved over all successful objects.
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Everything that happened in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub bucket: String,
    pub target: OutputTarget,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcomes in completion order
    pub outcomes: Vec<ObjectOutcome>,
    pub summary: RunSummary,
    /// Scheduling stopped early because of a cancel request
    pub cancelled: bool,
    /// Listing broke off after processing had started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_error: Option<String>,
}

impl RunReport {
    /// True when every discovered object succeeded and the listing
    /// completed.
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.listing_error.is_none() && !self.cancelled
    }

    /// Failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
