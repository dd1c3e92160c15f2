//! Data model shared by the storage, compression and output stages.
//!
//! `BucketObject` identifies a document in the bucket; `Document`, `Page` and
//! `EmbeddedImage` describe a parsed PDF and the raster images it carries.

mod document;
mod image;
mod object;
mod page;

pub use document::Document;
pub use image::{ColorModel, EmbeddedImage, ImageEncoding};
pub use object::{BucketObject, PDF_CONTENT_TYPE};
pub use page::Page;
