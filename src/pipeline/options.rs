//! Pipeline options.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::DEFAULT_MAX_OBJECT_SIZE;

/// Default number of documents processed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Options for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Documents in flight at once (1 = strictly sequential)
    pub concurrency: usize,

    /// Objects above this size fail at the fetch stage (`None` = unlimited)
    pub max_object_size: Option<u64>,

    /// Only process keys under this prefix
    pub prefix: Option<String>,

    /// Process at most this many documents
    pub limit: Option<usize>,

    /// Skip the upload when overwriting and compression changed nothing
    pub skip_unchanged: bool,
}

impl PipelineOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of documents in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Process one document at a time, in listing order.
    pub fn sequential(mut self) -> Self {
        self.concurrency = 1;
        self
    }

    /// Set the size threshold.
    pub fn with_max_object_size(mut self, limit: Option<u64>) -> Self {
        self.max_object_size = limit;
        self
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the document limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Upload even when compression changed nothing.
    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidPolicy(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_object_size: Some(DEFAULT_MAX_OBJECT_SIZE),
            prefix: None,
            limit: None,
            skip_unchanged: true,
        }
    }
}
