//! # reducepdf
//!
//! Shrink PDF documents stored in cloud buckets by recompressing the raster
//! images they embed.
//!
//! The pipeline lists every PDF in a bucket (across virtual folders),
//! downloads each one, re-encodes its images under a [`CompressionPolicy`]
//! and writes the smaller document back over the original or to a local
//! directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use reducepdf::{CompressionPolicy, ObjectStoreBucket, OutputTarget, Pipeline, PipelineOptions};
//!
//! # async fn run() -> reducepdf::Result<()> {
//! let bucket = Arc::new(ObjectStoreBucket::gcs("scanned-contracts", None)?);
//! let pipeline = Pipeline::new(
//!     bucket,
//!     OutputTarget::BucketOverwrite,
//!     CompressionPolicy::new().with_quality(60).with_max_dimension(2000),
//!     PipelineOptions::new().with_concurrency(8),
//! )?;
//!
//! let report = pipeline.run().await?;
//! println!("Saved {} bytes", report.summary.bytes_saved());
//! # Ok(())
//! # }
//! ```
//!
//! Single documents can be compressed without a bucket:
//!
//! ```no_run
//! use reducepdf::{compress_file, CompressionPolicy};
//!
//! let output = compress_file("scan.pdf", &CompressionPolicy::default()).unwrap();
//! std::fs::write("scan.small.pdf", &output.bytes).unwrap();
//! ```
//!
//! ## Features
//!
//! - **Image recompression**: JPEG re-encoding with optional Lanczos3
//!   downsampling; lossless re-deflate for bilevel, palette and masked images
//! - **Never larger**: documents that would not shrink pass through unchanged
//! - **Bounded concurrency**: several documents in flight, images of one
//!   document recompressed with Rayon
//! - **Failure isolation**: per-object outcomes collected in a serializable
//!   [`RunReport`]

pub mod compress;
pub mod detect;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod sink;
pub mod storage;

// Re-export commonly used types
pub use compress::{CompressedDocument, CompressionPolicy, CompressionStats, PdfCompressor, Treatment};
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, ErrorKind, Result};
pub use model::{BucketObject, ColorModel, Document, EmbeddedImage, ImageEncoding, Page};
pub use pipeline::{
    CancelToken, ObjectOutcome, OutcomeStatus, Pipeline, PipelineObserver, PipelineOptions,
    RunReport, RunSummary, Stage,
};
pub use sink::{LocalLayout, OutputSink, OutputTarget, WriteReceipt};
pub use storage::{Bucket, ObjectFetcher, ObjectLister, ObjectStoreBucket};

use std::path::Path;

/// Compress a PDF held in memory.
///
/// # Example
///
/// ```no_run
/// use reducepdf::{compress_bytes, CompressionPolicy};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let output = compress_bytes(&data, &CompressionPolicy::default()).unwrap();
/// assert!(output.bytes.len() <= data.len());
/// ```
pub fn compress_bytes(data: &[u8], policy: &CompressionPolicy) -> Result<CompressedDocument> {
    PdfCompressor::new(policy.clone())?.compress(data)
}

/// Compress a PDF file. The file itself is not modified.
pub fn compress_file<P: AsRef<Path>>(
    path: P,
    policy: &CompressionPolicy,
) -> Result<CompressedDocument> {
    let data = std::fs::read(path)?;
    compress_bytes(&data, policy)
}
