//! `object_store` backed buckets.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};

use super::Bucket;
use crate::error::{Error, Result};
use crate::model::{BucketObject, PDF_CONTENT_TYPE};

/// A bucket served by an [`ObjectStore`] implementation.
#[derive(Debug, Clone)]
pub struct ObjectStoreBucket {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBucket {
    /// Wrap an existing store.
    pub fn new(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Google Cloud Storage bucket.
    ///
    /// Credentials come from the given service account file, or else from
    /// the `GOOGLE_*` environment variables and application default
    /// credentials.
    #[cfg(feature = "gcp")]
    pub fn gcs(bucket: &str, credentials: Option<&std::path::Path>) -> Result<Self> {
        use object_store::gcp::GoogleCloudStorageBuilder;

        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        if let Some(path) = credentials {
            builder = builder.with_service_account_path(path.to_string_lossy());
        }

        let store = builder.build().map_err(|e| Error::AccessDenied {
            bucket: bucket.to_string(),
            message: e.to_string(),
        })?;
        log::debug!("Connected to gs://{}", bucket);

        Ok(Self::new(bucket, Arc::new(store)))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    fn path(&self, key: &str) -> Result<Path> {
        Path::parse(key).map_err(|e| Error::Other(format!("invalid object key '{}': {}", key, e)))
    }

    fn listing_error(&self, err: object_store::Error) -> Error {
        match classify(&err) {
            Failure::NotFound => Error::BucketNotFound(self.name.clone()),
            Failure::Denied => Error::AccessDenied {
                bucket: self.name.clone(),
                message: err.to_string(),
            },
            Failure::Other => Error::Listing {
                bucket: self.name.clone(),
                message: err.to_string(),
            },
        }
    }
}

#[async_trait]
impl Bucket for ObjectStoreBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: Option<&str>) -> BoxStream<'_, Result<BucketObject>> {
        let prefix = match prefix.filter(|p| !p.is_empty()).map(|p| self.path(p)) {
            Some(Ok(path)) => Some(path),
            Some(Err(e)) => return futures::stream::once(async move { Err(e) }).boxed(),
            None => None,
        };

        self.store
            .list(prefix.as_ref())
            .map(move |item| match item {
                Ok(meta) => Ok(BucketObject::new(
                    self.name.clone(),
                    meta.location.as_ref(),
                    meta.size as u64,
                )),
                Err(e) => Err(self.listing_error(e)),
            })
            .boxed()
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let transfer = |e: object_store::Error| Error::Transfer {
            key: key.to_string(),
            message: e.to_string(),
        };
        let path = self.path(key)?;
        let result = self.store.get(&path).await.map_err(transfer)?;
        result.bytes().await.map_err(transfer)
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let location = format!("{}/{}", self.name, key);
        let path = self.path(key)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, PDF_CONTENT_TYPE.into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&path, PutPayload::from_bytes(data), options)
            .await
            .map_err(|e| Error::Write {
                location,
                message: e.to_string(),
            })?;
        Ok(())
    }
}

enum Failure {
    NotFound,
    Denied,
    Other,
}

/// Map a store error onto the bucket-level failure it represents.
///
/// Some backends only report list failures as generic errors carrying the
/// HTTP status, so the message is inspected as well.
fn classify(err: &object_store::Error) -> Failure {
    match err {
        object_store::Error::NotFound { .. } => Failure::NotFound,
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. } => Failure::Denied,
        _ => {
            let message = err.to_string();
            if message.contains("404") || message.contains("does not exist") {
                Failure::NotFound
            } else if message.contains("401") || message.contains("403") {
                Failure::Denied
            } else {
                Failure::Other
            }
        }
    }
}
