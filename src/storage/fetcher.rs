//! Object download.

use std::sync::Arc;

use bytes::Bytes;

use super::Bucket;
use crate::error::{Error, Result};
use crate::model::BucketObject;

/// Default size threshold: 256 MiB.
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 256 * 1024 * 1024;

/// Downloads single objects into memory.
#[derive(Clone)]
pub struct ObjectFetcher {
    bucket: Arc<dyn Bucket>,
    max_object_size: Option<u64>,
}

impl ObjectFetcher {
    /// Create a fetcher with the default size threshold.
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Self {
            bucket,
            max_object_size: Some(DEFAULT_MAX_OBJECT_SIZE),
        }
    }

    /// Set the size threshold; `None` disables it.
    pub fn with_max_object_size(mut self, limit: Option<u64>) -> Self {
        self.max_object_size = limit;
        self
    }

    /// Download the object's bytes. Single attempt, no retry.
    pub async fn fetch(&self, object: &BucketObject) -> Result<Bytes> {
        self.check_size(object, object.size)?;

        let data = self.bucket.get(&object.key).await?;
        // The listed size may be stale
        self.check_size(object, data.len() as u64)?;

        log::debug!("Fetched {} ({} bytes)", object.key, data.len());
        Ok(data)
    }

    fn check_size(&self, object: &BucketObject, size: u64) -> Result<()> {
        match self.max_object_size {
            Some(limit) if size > limit => Err(Error::TooLarge {
                key: object.key.clone(),
                size,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for ObjectFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFetcher")
            .field("bucket", &self.bucket.name())
            .field("max_object_size", &self.max_object_size)
            .finish()
    }
}
