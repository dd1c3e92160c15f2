//! Pixel decoding and re-encoding of image streams.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::Stream;

use super::predictor::Predictor;
use crate::model::{ColorModel, EmbeddedImage, ImageEncoding};

/// Upper bound on inflated image data when the expected size is unknown.
const MAX_INFLATED_LEN: usize = 1 << 30;

/// Image-level decode/encode failures. These never fail a document.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CodecError {
    #[error("unsupported image: {0}")]
    Unsupported(String),

    #[error("cannot decode image data: {0}")]
    Decode(String),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("deflate error: {0}")]
    Io(#[from] io::Error),
}

/// Decoded 8-bit samples, always gray or RGB.
#[derive(Debug, Clone)]
pub(crate) enum Pixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Pixels {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Pixels::Gray(img) => img.dimensions(),
            Pixels::Rgb(img) => img.dimensions(),
        }
    }

    pub fn is_gray(&self) -> bool {
        matches!(self, Pixels::Gray(_))
    }

    /// Shrink so the longest edge fits `max_dimension`, keeping the aspect
    /// ratio. Returns `None` when the image already fits.
    pub fn downsample(&self, max_dimension: u32) -> Option<Pixels> {
        let (width, height) = self.dimensions();
        let (new_width, new_height) = fit_within(width, height, max_dimension)?;

        let resized = match self {
            Pixels::Gray(img) => Pixels::Gray(image::imageops::resize(
                img,
                new_width,
                new_height,
                FilterType::Lanczos3,
            )),
            Pixels::Rgb(img) => Pixels::Rgb(image::imageops::resize(
                img,
                new_width,
                new_height,
                FilterType::Lanczos3,
            )),
        };
        Some(resized)
    }

    /// Encode as a baseline JPEG.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            match self {
                Pixels::Gray(img) => encoder.encode_image(img)?,
                Pixels::Rgb(img) => encoder.encode_image(img)?,
            }
        }
        Ok(buffer)
    }
}

/// Target size for a downsample, or `None` if the image fits.
pub(crate) fn fit_within(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return None;
    }
    let scale = max_dimension as f64 / longest as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).clamp(1, max_dimension);
    Some((scaled(width), scaled(height)))
}

/// Decode an 8-bit Gray/RGB/CMYK image stream to pixels. CMYK is converted
/// to RGB.
pub(crate) fn decode_pixels(image: &EmbeddedImage, stream: &Stream) -> Result<Pixels, CodecError> {
    let components = image
        .color
        .components()
        .ok_or_else(|| CodecError::Unsupported(format!("color space {:?}", image.color)))?;

    if image.encoding == ImageEncoding::Dct {
        let decoded = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?;
        return match image.color {
            ColorModel::Gray => Ok(Pixels::Gray(decoded.to_luma8())),
            ColorModel::Rgb => Ok(Pixels::Rgb(decoded.to_rgb8())),
            _ => Err(CodecError::Unsupported(format!(
                "DCT image in {:?}",
                image.color
            ))),
        };
    }

    let expected = image.pixel_count() as usize * components as usize;
    let samples = decode_samples(stream, &image.encoding, expected + image.height as usize)?;
    if samples.len() < expected {
        return Err(CodecError::Decode(format!(
            "{} sample bytes, expected {}",
            samples.len(),
            expected
        )));
    }
    let samples = &samples[..expected];

    let (width, height) = (image.width, image.height);
    let pixels = match image.color {
        ColorModel::Gray => GrayImage::from_raw(width, height, samples.to_vec()).map(Pixels::Gray),
        ColorModel::Rgb => RgbImage::from_raw(width, height, samples.to_vec()).map(Pixels::Rgb),
        ColorModel::Cmyk => RgbImage::from_raw(width, height, cmyk_to_rgb(samples)).map(Pixels::Rgb),
        _ => None,
    };
    pixels.ok_or_else(|| CodecError::Decode("sample buffer does not match dimensions".to_string()))
}

/// Raw samples of a Raw or Flate stream, with PNG predictors undone.
fn decode_samples(
    stream: &Stream,
    encoding: &ImageEncoding,
    limit: usize,
) -> Result<Vec<u8>, CodecError> {
    match encoding {
        ImageEncoding::Raw => Ok(stream.content.clone()),
        ImageEncoding::Flate => {
            let inflated = inflate(&stream.content, limit)?;
            match Predictor::from_params(stream.dict.get(b"DecodeParms").ok()) {
                Some(predictor) => predictor.decode(&inflated),
                None => Ok(inflated),
            }
        }
        other => Err(CodecError::Unsupported(format!("filter {:?}", other))),
    }
}

/// Inflate zlib data, refusing output beyond `limit` bytes.
pub(crate) fn inflate(data: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    let limit = limit.min(MAX_INFLATED_LEN);
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut output)?;
    if output.len() > limit {
        return Err(CodecError::Decode(format!(
            "inflated data exceeds {} bytes",
            limit
        )));
    }
    Ok(output)
}

/// Deflate at the best compression level.
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Naive CMYK to RGB conversion; no color management.
fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() / 4 * 3);
    for px in samples.chunks_exact(4) {
        let k = 255 - u16::from(px[3]);
        for &channel in &px[..3] {
            rgb.push(((255 - u16::from(channel)) * k / 255) as u8);
        }
    }
    rgb
}
