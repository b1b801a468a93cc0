//! Stream filters.
//!
//! The object store only needs two things from a codec: turn encoded bytes into
//! decoded bytes, and (for the writer) the reverse. Built in:
//! - FlateDecode (zlib/deflate), with PNG/TIFF predictors
//! - ASCIIHexDecode
//!
//! Anything else reports [`Error::UnsupportedFilter`].

use crate::error::{Error, Result};

mod ascii_hex;
mod flate;
mod predictor;

pub use ascii_hex::AsciiHexFilter;
pub use flate::FlateFilter;
pub use predictor::{decode_predictor, DecodeParams};

/// A codec keyed by its filter name.
pub trait StreamFilter {
    /// Decode `input`. `params` is the matching `/DecodeParms` entry, if any.
    fn decode(&self, input: &[u8], params: Option<&DecodeParams>) -> Result<Vec<u8>>;

    /// Encode `input`.
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this filter (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Look up a filter by its `/Filter` name, accepting the inline-image abbreviations.
pub fn filter_for(name: &str) -> Option<Box<dyn StreamFilter>> {
    match name {
        "FlateDecode" | "Fl" => Some(Box::new(FlateFilter)),
        "ASCIIHexDecode" | "AHx" => Some(Box::new(AsciiHexFilter)),
        _ => None,
    }
}

/// Decode stream data through a filter pipeline.
///
/// `params[i]` belongs to `filters[i]`; missing entries mean "no parameters".
///
/// # Examples
///
/// ```
/// use pdf_objgraph::decoders::decode_stream;
///
/// let decoded = decode_stream(b"4869>", &["ASCIIHexDecode".to_string()], &[]).unwrap();
/// assert_eq!(decoded, b"Hi");
/// ```
pub fn decode_stream(data: &[u8], filters: &[String], params: &[Option<DecodeParams>]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for (i, name) in filters.iter().enumerate() {
        let filter = filter_for(name).ok_or_else(|| Error::UnsupportedFilter(name.clone()))?;
        let filter_params = params.get(i).and_then(|p| p.as_ref());
        current = filter.decode(&current, filter_params)?;
        log::trace!("{} produced {} bytes", filter.name(), current.len());
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_lookup() {
        assert_eq!(filter_for("FlateDecode").map(|f| f.name().to_string()), Some("FlateDecode".into()));
        assert_eq!(filter_for("AHx").map(|f| f.name().to_string()), Some("ASCIIHexDecode".into()));
        assert!(filter_for("LZWDecode").is_none());
    }

    #[test]
    fn test_decode_stream_unsupported() {
        match decode_stream(b"abc", &["DCTDecode".to_string()], &[]) {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "DCTDecode"),
            other => panic!("expected UnsupportedFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_stream_chain() {
        let flate = FlateFilter.encode(b"chained payload").unwrap();
        let hex = AsciiHexFilter.encode(&flate).unwrap();
        let out = decode_stream(
            &hex,
            &["ASCIIHexDecode".to_string(), "FlateDecode".to_string()],
            &[None, None],
        )
        .unwrap();
        assert_eq!(out, b"chained payload");
    }

    #[test]
    fn test_decode_stream_rejects_overflowing_columns() {
        let encoded = FlateFilter.encode(&[2, 1, 2, 3]).unwrap();
        let params = DecodeParams {
            predictor: 12,
            columns: 4_611_686_018_427_387_904,
            ..Default::default()
        };
        let result = decode_stream(&encoded, &["FlateDecode".to_string()], &[Some(params)]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_stream_empty_pipeline() {
        assert_eq!(decode_stream(b"raw", &[], &[]).unwrap(), b"raw");
    }
}
