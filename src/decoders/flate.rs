//! FlateDecode (zlib/deflate) implementation.
//!
//! Uses the flate2 crate. Cross-reference and object streams are nearly always
//! Flate-compressed, usually with a PNG Up predictor on the xref stream.

use crate::decoders::{decode_predictor, DecodeParams, StreamFilter};
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// FlateDecode filter implementation.
pub struct FlateFilter;

impl StreamFilter for FlateFilter {
    fn decode(&self, input: &[u8], params: Option<&DecodeParams>) -> Result<Vec<u8>> {
        let inflated = inflate(input)?;
        match params {
            Some(p) if p.predictor > 1 => decode_predictor(&inflated, p),
            _ => Ok(inflated),
        }
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) => e,
    };

    // Truncated streams are common; keep what was inflated before the damage
    if !output.is_empty() {
        log::warn!(
            "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
            output.len(),
            zlib_err
        );
        return Ok(output);
    }

    // Some producers omit the zlib wrapper
    log::debug!("Zlib decode failed ({}), trying raw deflate", zlib_err);
    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(_) if !output.is_empty() => {
            log::warn!("Raw deflate partial recovery: {} bytes", output.len());
            Ok(output)
        },
        Err(e) => Err(Error::Decode(format!("FlateDecode failed: {}; raw deflate: {}", zlib_err, e))),
    }
}
