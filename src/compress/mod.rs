//! Image recompression.
//!
//! [`PdfCompressor`] loads a document, picks a [`Treatment`] for every
//! embedded image, re-encodes the eligible ones under a
//! [`CompressionPolicy`] and serializes the result. Page content streams are
//! never rewritten, so image placement stays exactly as it was.

mod codec;
mod compressor;
mod policy;
mod predictor;
mod treatment;

pub use compressor::{CompressedDocument, CompressionStats, PdfCompressor};
pub use policy::{CompressionPolicy, DEFAULT_QUALITY};
pub use treatment::Treatment;
