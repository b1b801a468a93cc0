//! Object stream parsing (PDF 1.5+).
//!
//! Object streams (/Type /ObjStm) allow multiple objects to be compressed together
//! in a single stream. The cross-reference table points at a member by the stream's
//! object number and the member's index inside the stream.
//!
//! # Format
//!
//! ```text
//! N 0 obj
//! << /Type /ObjStm
//!    /N 3              % Number of objects in stream
//!    /First 16         % Byte offset to first object's data
//!    /Filter /FlateDecode
//! >>
//! stream
//! 10 0 11 3 12 9   % Pairs: (obj_num, offset)
//! 42 /Test (abc)
//! endstream
//! endobj
//! ```
//!
//! The first part contains N pairs of integers (object number, byte offset relative
//! to /First). The second part contains the actual object data.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{DocumentId, Object};
use crate::parser::{parse_object_with, ParseContext};
use crate::parser_config::ParserOptions;
use bytes::Bytes;

/// A decoded object stream with its header table read.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    data: Bytes,
    first: usize,
    pairs: Vec<(u32, usize)>,
}

impl ObjectStream {
    /// Decode `stream_obj` and read its `/N` header pairs.
    ///
    /// # Errors
    ///
    /// - the object is not a stream, or is typed as something other than `/ObjStm`
    /// - `/N` or `/First` is missing or out of range
    /// - the payload cannot be decoded
    /// - the header table is short (strict mode; permissive mode keeps the pairs read)
    pub fn parse(stream_obj: &Object, options: &ParserOptions) -> Result<Self> {
        let dict = match stream_obj {
            Object::Stream { dict, .. } => dict,
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "ObjStm".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        match dict.get("Type").and_then(|t| t.as_name()) {
            Some("ObjStm") => {},
            found => {
                return Err(Error::InvalidObjectType {
                    expected: "ObjStm".to_string(),
                    found: found.unwrap_or("untyped stream").to_string(),
                })
            },
        }

        let n = dict
            .get("N")
            .and_then(|o| o.as_integer())
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| Error::ReadError("object stream has no valid /N".to_string()))?
            as usize;
        let first = dict
            .get("First")
            .and_then(|o| o.as_integer())
            .filter(|f| *f >= 0)
            .ok_or_else(|| Error::ReadError("object stream has no valid /First".to_string()))?
            as usize;

        let data = stream_obj.get_data_with_limit(options.max_decompressed_size)?;
        if data.len() < first {
            return Err(Error::ReadError(format!(
                "object stream data too short: {} bytes, /First is {}",
                data.len(),
                first
            )));
        }

        let pairs = read_pairs(&data[..first], n, options)?;
        Ok(Self { data, first, pairs })
    }

    /// Number of members listed in the header.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the header lists no members.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(object number, relative offset)` pairs in header order.
    pub fn pairs(&self) -> &[(u32, usize)] {
        &self.pairs
    }

    /// Find the data offset of member `obj_num`, expected at header slot `index`.
    ///
    /// A slot naming a different object is a strict error; permissive mode falls
    /// back to searching the header by number.
    pub fn member_offset(&self, obj_num: u32, index: u32, options: &ParserOptions) -> Result<Option<usize>> {
        if let Some(&(num, offset)) = self.pairs.get(index as usize) {
            if num == obj_num {
                return Ok(Some(offset));
            }
        }
        options.tolerate(format!("Object {} is not at index {} of its object stream", obj_num, index))?;
        Ok(self
            .pairs
            .iter()
            .find(|(num, _)| *num == obj_num)
            .map(|&(_, offset)| offset))
    }

    /// Parse member `obj_num` (header slot `index`), stamping references with `owner`.
    ///
    /// Members that cannot be found or parsed are a strict `ReadError`; permissive
    /// mode logs and yields `Null`.
    pub fn parse_member(
        &self,
        obj_num: u32,
        index: u32,
        owner: DocumentId,
        options: &ParserOptions,
    ) -> Result<Object> {
        let Some(offset) = self.member_offset(obj_num, index, options)? else {
            options.tolerate(format!("Object {} not found in object stream", obj_num))?;
            return Ok(Object::Null);
        };

        let objects = &self.data[self.first..];
        if offset >= objects.len() {
            options.tolerate(format!(
                "Object {} offset {} is beyond object stream data ({} bytes)",
                obj_num,
                offset,
                objects.len()
            ))?;
            return Ok(Object::Null);
        }

        let mut ctx = ParseContext::for_document(owner, *options, None, objects.len());
        match parse_object_with(&objects[offset..], &mut ctx) {
            Ok((_, obj)) => Ok(obj),
            Err(e) if options.strict => Err(Error::ReadError(format!("Cannot read object stream member {}: {}", obj_num, e))),
            Err(e) => {
                log::warn!("Failed to parse object {} from object stream: {}", obj_num, e);
                Ok(Object::Null)
            },
        }
    }
}

/// Read `count` integer pairs from the header section.
fn read_pairs(header: &[u8], count: usize, options: &ParserOptions) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count.min(header.len() / 2 + 1));
    let mut remaining = header;

    for i in 0..count {
        let pair = match token(remaining) {
            Ok((rest, Token::Integer(num))) => match token(rest) {
                Ok((rest, Token::Integer(offset))) => {
                    remaining = rest;
                    u32::try_from(num).ok().zip(usize::try_from(offset).ok())
                },
                _ => None,
            },
            _ => None,
        };
        match pair {
            Some(pair) => pairs.push(pair),
            None => {
                options.tolerate(format!("Object stream header ends after {} of {} pairs", i, count))?;
                break;
            },
        }
    }

    Ok(pairs)
}
