//! Overwrite in place.

use std::sync::Arc;

use bytes::Bytes;

use super::WriteReceipt;
use crate::error::Result;
use crate::model::BucketObject;
use crate::storage::Bucket;

/// Replaces objects at their original key.
///
/// The upload is a single PUT, so readers see either the old or the new
/// document. Unconditional and not versioned.
#[derive(Clone)]
pub struct BucketSink {
    bucket: Arc<dyn Bucket>,
}

impl BucketSink {
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Self { bucket }
    }

    pub async fn write(&self, object: &BucketObject, data: Bytes) -> Result<WriteReceipt> {
        let bytes_written = data.len() as u64;
        self.bucket.put(&object.key, data).await?;

        let location = format!("{}/{}", self.bucket.name(), object.key);
        log::debug!("Uploaded {} ({} bytes)", location, bytes_written);
        Ok(WriteReceipt {
            location,
            bytes_written,
        })
    }
}

impl std::fmt::Debug for BucketSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketSink")
            .field("bucket", &self.bucket.name())
            .finish()
    }
}
