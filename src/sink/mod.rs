//! Output targets for compressed documents.

mod bucket;
mod local;

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::BucketObject;
use crate::storage::Bucket;

pub use bucket::BucketSink;
pub use local::LocalSink;

/// Default local output root.
pub const DEFAULT_OUTPUT_DIR: &str = "pdfs";

/// How bucket keys map onto local file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalLayout {
    /// Virtual folders become directories
    #[default]
    Mirror,
    /// Folder separators are replaced by `_` in a single directory
    Flatten,
}

/// Where compressed documents go. Chosen once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Replace the original object in the bucket
    BucketOverwrite,
    /// Write below a local directory
    LocalPath { root: PathBuf, layout: LocalLayout },
}

impl OutputTarget {
    /// Local output with the mirrored layout.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        OutputTarget::LocalPath {
            root: root.into(),
            layout: LocalLayout::Mirror,
        }
    }

    /// Whether writing replaces the source object.
    pub fn is_destructive(&self) -> bool {
        matches!(self, OutputTarget::BucketOverwrite)
    }
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self::local(DEFAULT_OUTPUT_DIR)
    }
}

/// Confirmation of a completed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// `bucket/key` or a filesystem path
    pub location: String,
    pub bytes_written: u64,
}

/// A configured output target.
#[derive(Debug, Clone)]
pub enum OutputSink {
    Bucket(BucketSink),
    Local(LocalSink),
}

impl OutputSink {
    /// Build the sink for `target`. The bucket is only used for overwrites.
    pub fn from_target(target: &OutputTarget, bucket: Arc<dyn Bucket>) -> Self {
        match target {
            OutputTarget::BucketOverwrite => OutputSink::Bucket(BucketSink::new(bucket)),
            OutputTarget::LocalPath { root, layout } => {
                OutputSink::Local(LocalSink::new(root.clone(), *layout))
            }
        }
    }

    /// Write the compressed bytes for `object`. The write is atomic: on
    /// failure the previous content at the destination is left intact.
    pub async fn write(&self, object: &BucketObject, data: Bytes) -> Result<WriteReceipt> {
        match self {
            OutputSink::Bucket(sink) => sink.write(object, data).await,
            OutputSink::Local(sink) => sink.write(object, data).await,
        }
    }

    /// Whether writing replaces the source object.
    pub fn is_destructive(&self) -> bool {
        matches!(self, OutputSink::Bucket(_))
    }
}
