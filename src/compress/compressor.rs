//! Whole-document compression.

use lopdf::{Dictionary, Object, Stream};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::codec::{self, CodecError};
use super::{CompressionPolicy, Treatment};
use crate::error::Result;
use crate::model::{ColorModel, Document, EmbeddedImage, ImageEncoding};

/// Counters collected while compressing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub pages: usize,
    /// Distinct image XObjects reachable from the pages
    pub images_found: usize,
    /// Images whose stream was replaced
    pub images_recompressed: usize,
    /// Replaced images that were also downsampled
    pub images_downsampled: usize,
    /// Images left untouched
    pub images_kept: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    /// The input was returned as is because re-serializing did not shrink it
    pub unchanged: bool,
}

impl CompressionStats {
    /// Bytes saved; zero when nothing shrank.
    pub fn saved_bytes(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }

    /// Output size relative to the input (1.0 = unchanged).
    pub fn ratio(&self) -> f64 {
        if self.bytes_before == 0 {
            1.0
        } else {
            self.bytes_after as f64 / self.bytes_before as f64
        }
    }
}

/// Result of compressing one document.
#[derive(Debug, Clone)]
pub struct CompressedDocument {
    /// Serialized document, never larger than the input
    pub bytes: Vec<u8>,
    pub stats: CompressionStats,
}

/// Recompresses the images embedded in PDF documents.
///
/// # Example
///
/// ```no_run
/// use reducepdf::{CompressionPolicy, PdfCompressor};
///
/// let compressor = PdfCompressor::new(CompressionPolicy::new().with_quality(60))?;
/// let input = std::fs::read("scan.pdf")?;
/// let output = compressor.compress(&input)?;
/// println!("{} -> {} bytes", output.stats.bytes_before, output.stats.bytes_after);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PdfCompressor {
    policy: CompressionPolicy,
}

enum ImageOutcome {
    Replaced { stream: Stream, downsampled: bool },
    Kept,
}

impl PdfCompressor {
    /// Create a compressor, validating the policy.
    pub fn new(policy: CompressionPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy in use.
    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Compress a document.
    ///
    /// Fails only when the document itself cannot be loaded or serialized;
    /// problems with individual images leave those images untouched.
    pub fn compress(&self, data: &[u8]) -> Result<CompressedDocument> {
        let mut doc = Document::load(data)?;
        let images: Vec<EmbeddedImage> = doc.images().into_iter().cloned().collect();

        let mut stats = CompressionStats {
            pages: doc.page_count(),
            images_found: images.len(),
            bytes_before: data.len() as u64,
            ..Default::default()
        };

        // Move the image streams out of the object table so they can be
        // processed without holding a borrow on the document.
        let objects = &mut doc.objects_mut().objects;
        let jobs: Vec<(EmbeddedImage, Stream)> = images
            .into_iter()
            .filter_map(|image| match objects.remove(&image.id) {
                Some(Object::Stream(stream)) => Some((image, stream)),
                Some(other) => {
                    objects.insert(image.id, other);
                    None
                }
                None => None,
            })
            .collect();

        let process = |(image, stream): (EmbeddedImage, Stream)| {
            let outcome = self.recompress(&image, &stream);
            (image, stream, outcome)
        };
        let results: Vec<_> = if self.policy.parallel && jobs.len() > 1 {
            jobs.into_par_iter().map(&process).collect()
        } else {
            jobs.into_iter().map(&process).collect()
        };

        let objects = &mut doc.objects_mut().objects;
        for (image, original, outcome) in results {
            let stream = match outcome {
                ImageOutcome::Replaced {
                    stream,
                    downsampled,
                } => {
                    stats.images_recompressed += 1;
                    if downsampled {
                        stats.images_downsampled += 1;
                    }
                    log::trace!(
                        "Image {} {:?}: {} -> {} bytes",
                        image.name,
                        image.id,
                        original.content.len(),
                        stream.content.len()
                    );
                    stream
                }
                ImageOutcome::Kept => {
                    stats.images_kept += 1;
                    original
                }
            };
            objects.insert(image.id, Object::Stream(stream));
        }

        if self.policy.compress_streams {
            doc.objects_mut().compress();
        }

        let bytes = doc.to_bytes()?;
        if bytes.len() >= data.len() {
            log::debug!(
                "Output {} bytes is not smaller than input {} bytes, keeping input",
                bytes.len(),
                data.len()
            );
            stats.unchanged = true;
            stats.bytes_after = data.len() as u64;
            return Ok(CompressedDocument {
                bytes: data.to_vec(),
                stats,
            });
        }

        stats.bytes_after = bytes.len() as u64;
        Ok(CompressedDocument { bytes, stats })
    }

    fn recompress(&self, image: &EmbeddedImage, stream: &Stream) -> ImageOutcome {
        let treatment = Treatment::for_image(image);
        let result = match treatment {
            Treatment::Lossy => self.lossy(image, stream),
            Treatment::Lossless => lossless(image, stream),
            Treatment::Keep => Ok(None),
        };

        match result {
            Ok(Some((stream, downsampled))) => ImageOutcome::Replaced {
                stream,
                downsampled,
            },
            Ok(None) => ImageOutcome::Kept,
            Err(e) => {
                log::debug!(
                    "Keeping image {} {:?} ({:?}, {:?}): {}",
                    image.name,
                    image.id,
                    image.encoding,
                    treatment,
                    e
                );
                ImageOutcome::Kept
            }
        }
    }

    fn lossy(
        &self,
        image: &EmbeddedImage,
        stream: &Stream,
    ) -> std::result::Result<Option<(Stream, bool)>, CodecError> {
        let pixels = codec::decode_pixels(image, stream)?;
        let (pixels, downsampled) = match self
            .policy
            .max_dimension
            .and_then(|max| pixels.downsample(max))
        {
            Some(smaller) => (smaller, true),
            None => (pixels, false),
        };

        let jpeg = pixels.to_jpeg(self.policy.quality)?;
        if jpeg.len() >= stream.content.len() {
            return Ok(None);
        }

        let (width, height) = pixels.dimensions();
        let mut dict = stream.dict.clone();
        dict.set("Width", width as i64);
        dict.set("Height", height as i64);
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        dict.remove(b"DecodeParms");
        if image.color == ColorModel::Cmyk {
            dict.set(
                "ColorSpace",
                Object::Name(if pixels.is_gray() {
                    b"DeviceGray".to_vec()
                } else {
                    b"DeviceRGB".to_vec()
                }),
            );
        }

        Ok(Some((Stream::new(dict, jpeg), downsampled)))
    }
}

/// Re-deflate samples at the best level, keeping predictor parameters.
fn lossless(
    image: &EmbeddedImage,
    stream: &Stream,
) -> std::result::Result<Option<(Stream, bool)>, CodecError> {
    let samples = match image.encoding {
        ImageEncoding::Raw => stream.content.clone(),
        ImageEncoding::Flate => {
            let row = (image.width as usize * image.bits_per_component as usize * 4).div_ceil(8);
            codec::inflate(&stream.content, (row + 1) * image.height as usize)?
        }
        _ => return Ok(None),
    };

    let packed = codec::deflate(&samples)?;
    if packed.len() >= stream.content.len() {
        return Ok(None);
    }

    let mut dict = stream.dict.clone();
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    single_decode_parms(&mut dict, image.encoding == ImageEncoding::Flate);
    Ok(Some((Stream::new(dict, packed), false)))
}

/// Match `/DecodeParms` to a single-name `/Filter`: unwrap a one-element
/// array, or drop the entry when the parameters no longer apply.
fn single_decode_parms(dict: &mut Dictionary, keep: bool) {
    let params = match dict.get(b"DecodeParms") {
        Ok(Object::Array(items)) => items.first().cloned(),
        Ok(other) => Some(other.clone()),
        Err(_) => return,
    };
    match params {
        Some(params @ Object::Dictionary(_)) if keep => dict.set("DecodeParms", params),
        Some(params @ Object::Reference(_)) if keep => dict.set("DecodeParms", params),
        _ => {
            dict.remove(b"DecodeParms");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use std::io::Write;

    fn flate_image(width: u32, height: u32) -> EmbeddedImage {
        EmbeddedImage {
            id: (1, 0),
            page: 1,
            name: "Im0".to_string(),
            width,
            height,
            bits_per_component: 1,
            color: ColorModel::Gray,
            encoding: ImageEncoding::Flate,
            is_stencil_mask: false,
            has_soft_mask: false,
            has_color_key_mask: false,
            has_decode_array: false,
            encoded_len: 0,
        }
    }

    fn stored(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::none());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_lossless_unwraps_decode_parms_array() {
        let samples = vec![0xF0u8; 8 * 64];
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => vec![Object::Name(b"FlateDecode".to_vec())],
                "DecodeParms" => vec![Object::Dictionary(dictionary! { "Columns" => 64 })],
            },
            stored(&samples),
        );

        let (replaced, _) = lossless(&flate_image(64, 64), &stream).unwrap().unwrap();
        assert_eq!(
            replaced.dict.get(b"Filter").unwrap().as_name_str().unwrap(),
            "FlateDecode"
        );
        let params = replaced.dict.get(b"DecodeParms").unwrap();
        assert!(matches!(params, Object::Dictionary(_)));
        assert_eq!(
            params.as_dict().unwrap().get(b"Columns").unwrap().as_i64().unwrap(),
            64
        );
    }

    #[test]
    fn test_lossless_drops_null_decode_parms() {
        let samples = vec![0x0Fu8; 8 * 64];
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => vec![Object::Name(b"FlateDecode".to_vec())],
                "DecodeParms" => vec![Object::Null],
            },
            stored(&samples),
        );

        let (replaced, _) = lossless(&flate_image(64, 64), &stream).unwrap().unwrap();
        assert!(!replaced.dict.has(b"DecodeParms"));
    }

    #[test]
    fn test_lossless_raw_has_no_decode_parms() {
        let mut image = flate_image(64, 64);
        image.encoding = ImageEncoding::Raw;
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "DecodeParms" => dictionary! { "Columns" => 64 },
            },
            vec![0xAAu8; 8 * 64],
        );

        let (replaced, _) = lossless(&image, &stream).unwrap().unwrap();
        assert!(!replaced.dict.has(b"DecodeParms"));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let result = PdfCompressor::new(CompressionPolicy::new().with_quality(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_ratio() {
        let stats = CompressionStats {
            bytes_before: 200,
            bytes_after: 50,
            ..Default::default()
        };
        assert_eq!(stats.saved_bytes(), 150);
        assert!((stats.ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(CompressionStats::default().ratio(), 1.0);
    }

    #[test]
    fn test_not_a_pdf() {
        let compressor = PdfCompressor::new(CompressionPolicy::default()).unwrap();
        let err = compressor.compress(b"hello").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::CorruptDocument);
    }
}
