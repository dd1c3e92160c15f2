//! Per-image treatment selection.

use serde::{Deserialize, Serialize};

use crate::model::{ColorModel, EmbeddedImage, ImageEncoding};

/// How a single image is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Treatment {
    /// Decode to pixels, optionally downsample, re-encode as JPEG
    Lossy,
    /// Re-deflate the samples at the best Flate level
    Lossless,
    /// Leave the stream untouched
    Keep,
}

impl Treatment {
    /// Choose the treatment from color depth, color model and encoding.
    ///
    /// Only continuous-tone 8-bit images whose samples map straight to gray
    /// or RGB pixels are eligible for JPEG. Bilevel, palette and masked
    /// images keep exact sample values.
    pub fn for_image(image: &EmbeddedImage) -> Self {
        let exact_samples =
            image.is_stencil_mask || image.has_color_key_mask || image.has_decode_array;
        let continuous_tone = image.bits_per_component == 8
            && matches!(
                image.color,
                ColorModel::Gray | ColorModel::Rgb | ColorModel::Cmyk
            );

        match image.encoding {
            ImageEncoding::Raw | ImageEncoding::Flate => {
                if continuous_tone && !exact_samples {
                    Treatment::Lossy
                } else {
                    Treatment::Lossless
                }
            }
            // Adobe CMYK JPEGs are often stored inverted
            ImageEncoding::Dct
                if continuous_tone && !exact_samples && image.color != ColorModel::Cmyk =>
            {
                Treatment::Lossy
            }
            _ => Treatment::Keep,
        }
    }
}
