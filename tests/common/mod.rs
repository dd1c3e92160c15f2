//! PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Pixel layout of a fixture image.
#[derive(Debug, Clone, Copy)]
pub enum Fixture {
    /// 8-bit RGB gradient with noise, Flate encoded
    Photo,
    /// 8-bit gray gradient with noise, Flate encoded
    Gray,
    /// 1-bit checkerboard, unfiltered
    Bilevel,
}

/// Deterministic noise so fixtures are identical across runs.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 24) as u8
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Raw samples for a fixture image.
pub fn samples(kind: Fixture, width: u32, height: u32) -> Vec<u8> {
    let mut rng = Lcg(0x5eed);
    let mut data = Vec::new();
    for y in 0..height {
        match kind {
            Fixture::Photo => {
                for x in 0..width {
                    let noise = rng.next() / 8;
                    data.push(((x * 255 / width) as u8).saturating_add(noise));
                    data.push(((y * 255 / height) as u8).saturating_add(noise));
                    data.push((((x + y) * 127 / (width + height)) as u8).saturating_add(noise));
                }
            }
            Fixture::Gray => {
                for x in 0..width {
                    let noise = rng.next() / 6;
                    data.push((((x + y) * 200 / (width + height)) as u8).saturating_add(noise));
                }
            }
            Fixture::Bilevel => {
                let row_bytes = width.div_ceil(8);
                let pattern = if (y / 4) % 2 == 0 { 0xF0 } else { 0x0F };
                data.extend(std::iter::repeat(pattern).take(row_bytes as usize));
            }
        }
    }
    data
}

pub fn image_stream(kind: Fixture, width: u32, height: u32) -> Stream {
    let data = samples(kind, width, height);
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
    };
    match kind {
        Fixture::Photo => {
            dict.set("ColorSpace", "DeviceRGB");
            dict.set("BitsPerComponent", 8);
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, deflate(&data))
        }
        Fixture::Gray => {
            dict.set("ColorSpace", "DeviceGray");
            dict.set("BitsPerComponent", 8);
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, deflate(&data))
        }
        Fixture::Bilevel => {
            dict.set("ColorSpace", "DeviceGray");
            dict.set("BitsPerComponent", 1);
            Stream::new(dict, data).with_compression(false)
        }
    }
}

/// Builds single-document fixtures page by page.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Add an image object and return its id.
    pub fn add_image(&mut self, kind: Fixture, width: u32, height: u32) -> ObjectId {
        self.doc.add_object(image_stream(kind, width, height))
    }

    /// Add a page drawing `image` full-size, plus a line of text.
    pub fn add_image_page(&mut self, image: ObjectId) -> &mut Self {
        let content = b"q 400 0 0 300 100 400 cm /Im0 Do Q BT /F1 12 Tf 72 72 Td (Scanned page) Tj ET";
        let resources = dictionary! {
            "XObject" => dictionary! { "Im0" => image },
            "Font" => dictionary! { "F1" => self.font() },
        };
        self.add_page(content, resources)
    }

    /// Add a page that only shows text.
    pub fn add_text_page(&mut self, text: &str) -> &mut Self {
        let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font() },
        };
        self.add_page(content.as_bytes(), resources)
    }

    fn font(&mut self) -> ObjectId {
        self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        })
    }

    fn add_page(&mut self, content: &[u8], resources: Dictionary) -> &mut Self {
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        });
        self.kids.push(Object::Reference(page_id));
        self
    }

    pub fn build(&mut self) -> Vec<u8> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => self.kids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

/// One page showing one image.
pub fn image_pdf(kind: Fixture, width: u32, height: u32) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let image = builder.add_image(kind, width, height);
    builder.add_image_page(image).build()
}

/// Two pages sharing one photographic image.
pub fn shared_image_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let image = builder.add_image(Fixture::Photo, 200, 150);
    builder.add_image_page(image);
    builder.add_image_page(image).build()
}

/// Pages with text only.
pub fn text_pdf() -> Vec<u8> {
    PdfBuilder::new()
        .add_text_page("Quarterly report")
        .add_text_page("Appendix")
        .build()
}

/// Looks like a PDF but has no usable structure.
pub fn corrupt_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << /Type /Catalog >> garbage without trailer".to_vec()
}

/// Streams of every image XObject in a serialized document, in object order.
pub fn image_streams(data: &[u8]) -> Vec<Stream> {
    let doc = Document::load_mem(data).unwrap();
    doc.objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(s)
                if matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Image") =>
            {
                Some(s.clone())
            }
            _ => None,
        })
        .collect()
}

/// Decompressed content of the first page.
pub fn first_page_content(data: &[u8]) -> Vec<u8> {
    let doc = Document::load_mem(data).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    doc.get_page_content(page_id).unwrap()
}
