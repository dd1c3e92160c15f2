//! Image recompression policy.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 75;

/// How embedded images are re-encoded.
///
/// A policy is validated once when the compressor is built and then shared
/// read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    /// JPEG quality (1-100)
    pub quality: u8,

    /// Longest allowed pixel edge; larger images are downsampled
    pub max_dimension: Option<u32>,

    /// Flate-compress unfiltered non-image streams
    pub compress_streams: bool,

    /// Recompress the images of one document in parallel
    pub parallel: bool,
}

impl CompressionPolicy {
    /// Create a policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set JPEG quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the longest allowed pixel edge.
    pub fn with_max_dimension(mut self, pixels: u32) -> Self {
        self.max_dimension = Some(pixels);
        self
    }

    /// Enable or disable lossless stream compression.
    pub fn with_stream_compression(mut self, enabled: bool) -> Self {
        self.compress_streams = enabled;
        self
    }

    /// Disable parallel image processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidPolicy(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self.max_dimension == Some(0) {
            return Err(Error::InvalidPolicy(
                "max dimension must be at least 1 pixel".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimension: None,
            compress_streams: true,
            parallel: true,
        }
    }
}
