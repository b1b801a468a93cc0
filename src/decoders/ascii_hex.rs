//! ASCIIHexDecode implementation.
//!
//! Whitespace is ignored, `>` ends the data, and odd-length input is padded with an
//! implicit '0'.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn decode(&self, input: &[u8], _params: Option<&DecodeParams>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut digits = input
            .iter()
            .take_while(|&&c| c != b'>')
            .filter(|c| !c.is_ascii_whitespace());

        while let Some(&high) = digits.next() {
            let low = digits.next().copied().unwrap_or(b'0');
            let value = |d: u8| {
                (d as char)
                    .to_digit(16)
                    .map(|v| v as u8)
                    .ok_or_else(|| Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", d as char)))
            };
            output.push((value(high)? << 4) | value(low)?);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 2 + 1);
        for byte in input {
            out.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        out.push(b'>');
        Ok(out)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}
