//! PNG predictor decoding for Flate image streams (`/Predictor` >= 10).

use lopdf::{Dictionary, Object};

use super::codec::CodecError;

/// Predictor parameters from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Predictor {
    pub kind: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Predictor {
    /// Read predictor parameters. Returns `None` when no predictor applies.
    pub fn from_params(params: Option<&Object>) -> Option<Self> {
        let dict: &Dictionary = match params? {
            Object::Dictionary(dict) => dict,
            // A one-element array accompanies a one-element filter array
            Object::Array(items) => match items.as_slice() {
                [Object::Dictionary(dict)] => dict,
                _ => return None,
            },
            _ => return None,
        };

        let int = |key: &[u8], default: i64| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(default)
        };

        let kind = int(b"Predictor", 1);
        if kind <= 1 {
            return None;
        }

        Some(Self {
            kind,
            colors: int(b"Colors", 1).max(1) as usize,
            bits_per_component: int(b"BitsPerComponent", 8).max(1) as usize,
            columns: int(b"Columns", 1).max(1) as usize,
        })
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8)
    }

    fn bytes_per_row(&self) -> usize {
        (self.colors * self.bits_per_component * self.columns).div_ceil(8)
    }

    /// Undo the prediction.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if self.kind < 10 {
            return Err(CodecError::Unsupported(format!(
                "TIFF predictor {}",
                self.kind
            )));
        }

        let bpp = self.bytes_per_pixel();
        let row_len = self.bytes_per_row();
        let mut previous = vec![0u8; row_len];
        let mut output = Vec::with_capacity(data.len());

        for chunk in data.chunks(row_len + 1) {
            // A truncated final row is dropped
            if chunk.len() < row_len + 1 {
                break;
            }
            let mut current = chunk[1..].to_vec();
            unfilter_row(chunk[0], bpp, &previous, &mut current)?;
            output.extend_from_slice(&current);
            previous = current;
        }

        Ok(output)
    }
}

fn unfilter_row(
    filter: u8,
    bpp: usize,
    previous: &[u8],
    current: &mut [u8],
) -> Result<(), CodecError> {
    let len = current.len();
    match filter {
        // None
        0 => {}
        // Sub
        1 => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        // Up
        2 => {
            for i in 0..len {
                current[i] = current[i].wrapping_add(previous[i]);
            }
        }
        // Average
        3 => {
            for i in 0..len {
                let left = if i >= bpp { current[i - bpp] } else { 0 };
                let avg = ((u16::from(left) + u16::from(previous[i])) / 2) as u8;
                current[i] = current[i].wrapping_add(avg);
            }
        }
        // Paeth
        4 => {
            for i in 0..len {
                let (left, upper_left) = if i >= bpp {
                    (current[i - bpp], previous[i - bpp])
                } else {
                    (0, 0)
                };
                current[i] = current[i].wrapping_add(paeth(left, previous[i], upper_left));
            }
        }
        other => {
            return Err(CodecError::Decode(format!(
                "invalid PNG filter type {}",
                other
            )))
        }
    }
    Ok(())
}

fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let estimate = i16::from(left) + i16::from(above) - i16::from(upper_left);
    let to_left = (estimate - i16::from(left)).abs();
    let to_above = (estimate - i16::from(above)).abs();
    let to_upper_left = (estimate - i16::from(upper_left)).abs();

    if to_left <= to_above && to_left <= to_upper_left {
        left
    } else if to_above <= to_upper_left {
        above
    } else {
        upper_left
    }
}
