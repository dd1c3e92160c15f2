//! Bucket object identifiers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Content type stored on every written PDF.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Virtual folder separator in bucket keys.
const SEPARATOR: char = '/';

/// A single object discovered in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketObject {
    /// Bucket the object lives in
    pub bucket: String,

    /// Full key, including the virtual folder prefix
    pub key: String,

    /// Size in bytes as reported by the listing
    pub size: u64,

    /// Content type if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl BucketObject {
    /// Create a new object identifier. PDF keys get the PDF content type.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, size: u64) -> Self {
        let key = key.into();
        let content_type = if crate::storage::is_pdf_key(&key) {
            Some(PDF_CONTENT_TYPE.to_string())
        } else {
            None
        };

        Self {
            bucket: bucket.into(),
            key,
            size,
            content_type,
        }
    }

    /// Virtual folder segments, outermost first.
    ///
    /// `folder/sub/c.pdf` yields `["folder", "sub"]`; a top-level key yields
    /// nothing.
    pub fn folders(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.key.split(SEPARATOR).collect();
        segments.pop();
        segments
    }

    /// The last key segment.
    pub fn file_name(&self) -> &str {
        self.key.rsplit(SEPARATOR).next().unwrap_or(&self.key)
    }

    /// Relative filesystem path mirroring the folder structure.
    ///
    /// Returns `None` when a segment is empty, `.` or `..`, or contains a
    /// path separator of the host platform, since such a key cannot be
    /// mapped below an output root.
    pub fn relative_path(&self) -> Option<PathBuf> {
        let mut path = PathBuf::new();
        for segment in self.key.split(SEPARATOR) {
            if !is_safe_segment(segment) {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }

    /// Single file name with folder separators replaced by `_`.
    pub fn flattened_name(&self) -> Option<String> {
        let name = self.key.replace(SEPARATOR, "_");
        if is_safe_segment(&name) {
            Some(name)
        } else {
            None
        }
    }
}

impl std::fmt::Display for BucketObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('\\')
        && !segment.contains('\0')
}
