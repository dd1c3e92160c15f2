//! PDF discovery.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use super::Bucket;
use crate::error::Result;
use crate::model::BucketObject;

const PDF_SUFFIX: &str = ".pdf";

/// Check if a key names a PDF (case-insensitive `.pdf` suffix).
pub fn is_pdf_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() >= PDF_SUFFIX.len()
        && bytes[bytes.len() - PDF_SUFFIX.len()..].eq_ignore_ascii_case(PDF_SUFFIX.as_bytes())
}

/// Enumerates the PDF objects of a bucket, across all virtual folders.
#[derive(Clone)]
pub struct ObjectLister {
    bucket: Arc<dyn Bucket>,
    prefix: Option<String>,
}

impl ObjectLister {
    /// Create a lister over the whole bucket.
    pub fn new(bucket: Arc<dyn Bucket>) -> Self {
        Self {
            bucket,
            prefix: None,
        }
    }

    /// Restrict listing to keys under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// A fresh single-pass stream of PDF objects. Every call restarts the
    /// listing from the beginning.
    ///
    /// Errors are passed through; the stream does not retry.
    pub fn objects(&self) -> BoxStream<'_, Result<BucketObject>> {
        self.bucket
            .list(self.prefix.as_deref())
            .filter(|item| {
                let keep = match item {
                    Ok(object) => is_pdf_key(&object.key),
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .boxed()
    }
}

impl std::fmt::Debug for ObjectLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLister")
            .field("bucket", &self.bucket.name())
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_key() {
        assert!(is_pdf_key("a.pdf"));
        assert!(is_pdf_key("folder/sub/c.PDF"));
        assert!(is_pdf_key("x.Pdf"));
        assert!(!is_pdf_key("notes.txt"));
        assert!(!is_pdf_key("pdf"));
        assert!(!is_pdf_key("folder.pdf/readme"));
        assert!(!is_pdf_key(""));
    }
}
