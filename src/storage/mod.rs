//! Bucket access.
//!
//! The [`Bucket`] trait is the seam between the pipeline and a concrete
//! object store. [`ObjectStoreBucket`] implements it over any
//! `object_store::ObjectStore`; [`ObjectLister`] and [`ObjectFetcher`] build
//! the discovery and download stages on top of it.

mod fetcher;
mod lister;
mod store;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::model::BucketObject;

pub use fetcher::{ObjectFetcher, DEFAULT_MAX_OBJECT_SIZE};
pub use lister::{is_pdf_key, ObjectLister};
pub use store::ObjectStoreBucket;

/// A named, flat key space of binary objects.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Bucket name.
    fn name(&self) -> &str;

    /// List every object under `prefix`, recursively. Pagination is handled
    /// inside the stream.
    fn list(&self, prefix: Option<&str>) -> BoxStream<'_, Result<BucketObject>>;

    /// Download an object's bytes.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Store bytes under `key`, replacing any existing object in a single
    /// atomic request.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;
}
