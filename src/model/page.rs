//! Page-level types.

use serde::{Deserialize, Serialize};

use super::EmbeddedImage;

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Images reachable from the page resources, including those drawn
    /// through Form XObjects
    pub images: Vec<EmbeddedImage>,
}

impl Page {
    /// Create a new page.
    pub fn new(number: u32, images: Vec<EmbeddedImage>) -> Self {
        Self { number, images }
    }
}
