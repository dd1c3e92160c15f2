//! Parsed PDF documents.

use std::collections::HashSet;

use lopdf::{Dictionary, Object, ObjectId};

use super::image::{deref, is_subtype};
use super::{EmbeddedImage, Page};
use crate::detect::detect_format_from_bytes;
use crate::error::{Error, Result};

/// Page tree levels searched for inherited `/Resources`.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// An in-memory PDF with its pages and the images they reference.
///
/// The document owns the parsed object graph; image streams are replaced in
/// place and the whole graph is serialized again with [`Document::to_bytes`].
pub struct Document {
    inner: lopdf::Document,
    pages: Vec<Page>,
    version: String,
}

impl Document {
    /// Parse a document from its bytes.
    ///
    /// Non-PDF data fails with [`Error::UnknownFormat`], encrypted documents
    /// with [`Error::Encrypted`] and unparseable structure with
    /// [`Error::CorruptDocument`].
    pub fn load(data: &[u8]) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;
        if format.encrypted {
            return Err(Error::Encrypted);
        }

        let inner = lopdf::Document::load_mem(data)?;
        if inner.is_encrypted() {
            return Err(Error::Encrypted);
        }

        let pages = scan_pages(&inner);
        log::debug!(
            "Loaded PDF {} with {} pages, {} objects",
            format.version,
            pages.len(),
            inner.objects.len()
        );

        Ok(Self {
            inner,
            pages,
            version: format.version,
        })
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distinct images in page order. An image shared by several pages is
    /// reported once, for the first page that uses it.
    pub fn images(&self) -> Vec<&EmbeddedImage> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .flat_map(|page| page.images.iter())
            .filter(|image| seen.insert(image.id))
            .collect()
    }

    /// Header version (e.g. "1.7").
    pub fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn objects_mut(&mut self) -> &mut lopdf::Document {
        &mut self.inner
    }

    /// Serialize the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| Error::CorruptDocument(format!("failed to serialize: {}", e)))?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("pages", &self.pages.len())
            .field("objects", &self.inner.objects.len())
            .finish()
    }
}

fn scan_pages(doc: &lopdf::Document) -> Vec<Page> {
    doc.get_pages()
        .into_iter()
        .map(|(number, page_id)| {
            let mut images = Vec::new();
            let mut visited = HashSet::new();
            if let Some(resources) = page_resources(doc, page_id) {
                collect_images(doc, number, resources, &mut visited, &mut images);
            }
            Page::new(number, images)
        })
        .collect()
}

/// Resources of a page, inherited from the page tree when absent.
fn page_resources(doc: &lopdf::Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return as_dict(doc, resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn collect_images(
    doc: &lopdf::Document,
    page: u32,
    resources: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<EmbeddedImage>,
) {
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|o| as_dict(doc, o)) else {
        return;
    };

    for (name, obj) in xobjects.iter() {
        let Ok(id) = obj.as_reference() else {
            continue;
        };
        // Forms may reference each other (or themselves)
        if !visited.insert(id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            continue;
        };

        if is_subtype(&stream.dict, b"Form") {
            if let Some(form_resources) = stream
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|o| as_dict(doc, o))
            {
                collect_images(doc, page, form_resources, visited, out);
            }
        } else if let Some(image) = EmbeddedImage::inspect(doc, id, page, name, stream) {
            out.push(image);
        }
    }
}

fn as_dict<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match deref(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}
