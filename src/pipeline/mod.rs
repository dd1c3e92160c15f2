//! The compression-and-sync pipeline.
//!
//! Every discovered object moves through
//! `Discovered -> Fetching -> Compressing -> Writing -> Done`, stopping at the
//! first failing stage. One object's failure never aborts the run.

mod cancel;
mod options;
mod orchestrator;
mod result;

pub use cancel::CancelToken;
pub use options::{PipelineOptions, DEFAULT_CONCURRENCY};
pub use orchestrator::{Pipeline, PipelineObserver};
pub use result::{ObjectOutcome, OutcomeStatus, RunReport, RunSummary, Stage};
