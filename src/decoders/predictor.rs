//! PNG and TIFF predictors.
//!
//! Cross-reference streams are almost always written with `/Predictor 12` (PNG Up),
//! one row per entry.

use crate::error::{Error, Result};
use crate::object::Dict;

/// Decode parameters for stream filters.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (samples per row)
    pub columns: usize,
    /// Number of color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Read `/Predictor`, `/Columns`, `/Colors` and `/BitsPerComponent` from a
    /// `/DecodeParms` dictionary.
    pub fn from_dict(dict: &Dict) -> Self {
        let int = |key: &str| dict.get(key).and_then(|o| o.as_integer());
        let defaults = Self::default();
        Self {
            predictor: int("Predictor").unwrap_or(defaults.predictor),
            columns: int("Columns").map(positive).unwrap_or(defaults.columns),
            colors: int("Colors").map(positive).unwrap_or(defaults.colors),
            bits_per_component: int("BitsPerComponent")
                .map(positive)
                .unwrap_or(defaults.bits_per_component),
        }
    }

    /// Bytes of sample data per row.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] when `Columns * Colors * BitsPerComponent` overflows.
    pub fn row_bytes(&self) -> Result<usize> {
        self.columns
            .checked_mul(self.colors)
            .and_then(|n| n.checked_mul(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| self.too_large())
    }

    /// Bytes per complete pixel, at least 1.
    fn pixel_bytes(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.bits_per_component)
            .map(|bits| bits.div_ceil(8).max(1))
            .ok_or_else(|| self.too_large())
    }

    fn too_large(&self) -> Error {
        Error::Decode(format!(
            "Predictor row too large: {} columns, {} colors, {} bits per component",
            self.columns, self.colors, self.bits_per_component
        ))
    }
}

fn positive(v: i64) -> usize {
    usize::try_from(v.max(1)).unwrap_or(usize::MAX)
}

/// Row length in bytes, refused when a single row would be wider than the data.
fn checked_row_len(data: &[u8], params: &DecodeParams) -> Result<usize> {
    let row_len = params.row_bytes()?;
    if row_len > data.len() {
        return Err(Error::Decode(format!(
            "Predictor row of {} bytes exceeds {} bytes of data",
            row_len,
            data.len()
        )));
    }
    Ok(row_len)
}

/// Reverse a predictor.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff(data, params),
        10..=15 => decode_png(data, params),
        other => Err(Error::Decode(format!("Unsupported predictor: {}", other))),
    }
}

fn decode_tiff(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }
    let row_len = checked_row_len(data, params)?;
    let bpp = params.pixel_bytes()?;
    let mut output = data.to_vec();
    for row in output.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(output)
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let row_len = checked_row_len(data, params)?;
    let bpp = params.pixel_bytes()?;
    let mut output: Vec<u8> = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        if chunk.len() < 2 {
            break;
        }
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => return Err(Error::Decode(format!("Invalid PNG predictor tag: {}", tag))),
            };
            row[i] = row[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&row);
        prev = row;
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
