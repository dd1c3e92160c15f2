//! Raster image XObjects embedded in a document.

use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

/// Color model of an image's samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup; samples are indices
    Indexed,
    /// Anything else (Lab, Separation, DeviceN, missing entry, ...)
    Other(String),
}

impl ColorModel {
    /// Number of color components per pixel, if known.
    pub fn components(&self) -> Option<u8> {
        match self {
            ColorModel::Gray | ColorModel::Indexed => Some(1),
            ColorModel::Rgb => Some(3),
            ColorModel::Cmyk => Some(4),
            ColorModel::Other(_) => None,
        }
    }

    /// Resolve a `/ColorSpace` entry.
    pub(crate) fn from_object(doc: &lopdf::Document, obj: Option<&Object>) -> Self {
        let Some(obj) = obj.map(|o| deref(doc, o)) else {
            return ColorModel::Other("None".to_string());
        };

        match obj {
            Object::Name(name) => Self::from_family(name),
            Object::Array(items) => {
                let family = match items.first().map(|o| deref(doc, o)) {
                    Some(Object::Name(name)) => name.as_slice(),
                    _ => return ColorModel::Other("Array".to_string()),
                };
                match family {
                    b"ICCBased" => {
                        let n = items
                            .get(1)
                            .map(|o| deref(doc, o))
                            .and_then(|o| match o {
                                Object::Stream(s) => s.dict.get(b"N").ok(),
                                _ => None,
                            })
                            .and_then(|n| n.as_i64().ok());
                        match n {
                            Some(1) => ColorModel::Gray,
                            Some(3) => ColorModel::Rgb,
                            Some(4) => ColorModel::Cmyk,
                            _ => ColorModel::Other("ICCBased".to_string()),
                        }
                    }
                    other => Self::from_family(other),
                }
            }
            _ => ColorModel::Other("Unknown".to_string()),
        }
    }

    fn from_family(name: &[u8]) -> Self {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => ColorModel::Gray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorModel::Rgb,
            b"DeviceCMYK" | b"CMYK" => ColorModel::Cmyk,
            b"Indexed" | b"I" => ColorModel::Indexed,
            other => ColorModel::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

/// Encoding of an image stream, from its `/Filter` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// No filter
    Raw,
    Flate,
    Dct,
    Jpx,
    Jbig2,
    Ccitt,
    Lzw,
    RunLength,
    /// Unknown filter or a chain of several filters
    Other(String),
}

impl ImageEncoding {
    pub(crate) fn from_object(doc: &lopdf::Document, obj: Option<&Object>) -> Self {
        match obj.map(|o| deref(doc, o)) {
            None => ImageEncoding::Raw,
            Some(Object::Name(name)) => Self::from_filter(name),
            Some(Object::Array(filters)) => match filters.as_slice() {
                [] => ImageEncoding::Raw,
                [single] => match deref(doc, single) {
                    Object::Name(name) => Self::from_filter(name),
                    _ => ImageEncoding::Other("Unknown".to_string()),
                },
                chain => {
                    let names: Vec<String> = chain
                        .iter()
                        .filter_map(|f| f.as_name_str().ok().map(String::from))
                        .collect();
                    ImageEncoding::Other(names.join("+"))
                }
            },
            Some(_) => ImageEncoding::Other("Unknown".to_string()),
        }
    }

    fn from_filter(name: &[u8]) -> Self {
        match name {
            b"FlateDecode" | b"Fl" => ImageEncoding::Flate,
            b"DCTDecode" | b"DCT" => ImageEncoding::Dct,
            b"JPXDecode" => ImageEncoding::Jpx,
            b"JBIG2Decode" => ImageEncoding::Jbig2,
            b"CCITTFaxDecode" | b"CCF" => ImageEncoding::Ccitt,
            b"LZWDecode" | b"LZW" => ImageEncoding::Lzw,
            b"RunLengthDecode" | b"RL" => ImageEncoding::RunLength,
            other => ImageEncoding::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

/// An image XObject referenced from a page's resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    /// Indirect object holding the image stream
    pub id: ObjectId,

    /// First page (1-indexed) that references the image
    pub page: u32,

    /// Resource name on that page (e.g. "Im0")
    pub name: String,

    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color: ColorModel,
    pub encoding: ImageEncoding,

    /// `/ImageMask true`: a 1-bit stencil
    pub is_stencil_mask: bool,

    /// Has an `/SMask` or an explicit `/Mask` stream
    pub has_soft_mask: bool,

    /// `/Mask` is a color-key range array
    pub has_color_key_mask: bool,

    /// Has a `/Decode` array remapping sample values
    pub has_decode_array: bool,

    /// Length of the encoded stream data
    pub encoded_len: usize,
}

impl EmbeddedImage {
    /// Describe an image stream. Returns `None` for streams that are not
    /// image XObjects or lack dimensions.
    pub(crate) fn inspect(
        doc: &lopdf::Document,
        id: ObjectId,
        page: u32,
        name: &[u8],
        stream: &Stream,
    ) -> Option<Self> {
        let dict = &stream.dict;
        if !is_subtype(dict, b"Image") {
            return None;
        }

        let int = |key: &[u8]| {
            dict.get(key)
                .ok()
                .map(|o| deref(doc, o))
                .and_then(|o| o.as_i64().ok())
        };

        let width = int(b"Width").filter(|w| *w > 0)? as u32;
        let height = int(b"Height").filter(|h| *h > 0)? as u32;

        let is_stencil_mask = matches!(
            dict.get(b"ImageMask").ok().map(|o| deref(doc, o)),
            Some(Object::Boolean(true))
        );
        let bits_per_component = if is_stencil_mask {
            1
        } else {
            int(b"BitsPerComponent").unwrap_or(8).clamp(0, 255) as u8
        };

        let (has_soft_mask, has_color_key_mask) = match dict.get(b"Mask").ok() {
            Some(Object::Array(_)) => (dict.has(b"SMask"), true),
            Some(Object::Reference(_)) => (true, false),
            _ => (dict.has(b"SMask"), false),
        };

        Some(Self {
            id,
            page,
            name: String::from_utf8_lossy(name).into_owned(),
            width,
            height,
            bits_per_component,
            color: ColorModel::from_object(doc, dict.get(b"ColorSpace").ok()),
            encoding: ImageEncoding::from_object(doc, dict.get(b"Filter").ok()),
            is_stencil_mask,
            has_soft_mask,
            has_color_key_mask,
            has_decode_array: dict.has(b"Decode"),
            encoded_len: stream.content.len(),
        })
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

static NULL: Object = Object::Null;

/// Follow a reference chain to its target. Dangling references resolve to
/// `Null`.
pub(crate) fn deref<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    // Bounded so a reference cycle cannot spin forever
    for _ in 0..8 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return &NULL,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn is_subtype(dict: &Dictionary, subtype: &[u8]) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == subtype)
}
