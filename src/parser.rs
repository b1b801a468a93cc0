//! PDF object parser.
//!
//! Recursive descent over lexer tokens:
//! 1. Read a token
//! 2. Decide which value it starts
//! 3. For arrays and dictionaries, recurse into the contents
//!
//! # Error Handling
//!
//! Every function returns the crate [`Result`] with the unconsumed input:
//! - input ending inside a value is [`Error::StreamTruncated`]
//! - an out-of-place token is [`Error::StreamError`]
//! - stream framing problems that cannot be repaired are [`Error::ReadError`]

use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, skip_ws, token, Token};
use crate::object::{Dict, DocumentId, Object, ObjectRef, ObjectResolver};
use crate::parser_config::ParserOptions;

/// Per-parse state: who owns the parsed references, how tolerant to be, and how to
/// reach the rest of the document for indirect `/Length` values.
pub struct ParseContext<'r> {
    /// Owner stamped on every parsed reference
    pub owner: DocumentId,
    /// Strictness and limits
    pub options: ParserOptions,
    resolver: Option<&'r dyn ObjectResolver>,
    /// Absolute offset of the end of the input; lets `offset_of` map a
    /// remaining slice back to a file position.
    end: Option<usize>,
    depth: usize,
}

impl<'r> ParseContext<'r> {
    /// A context with no document behind it. References are detached.
    pub fn new(options: ParserOptions) -> Self {
        Self {
            owner: DocumentId::DETACHED,
            options,
            resolver: None,
            end: None,
            depth: 0,
        }
    }

    /// A context for parsing inside a document's byte buffer.
    ///
    /// `source_len` is the length of the whole buffer; the inputs handed to
    /// [`parse_object_with`] must be suffixes of that buffer.
    pub fn for_document(
        owner: DocumentId,
        options: ParserOptions,
        resolver: Option<&'r dyn ObjectResolver>,
        source_len: usize,
    ) -> Self {
        Self {
            owner,
            options,
            resolver,
            end: Some(source_len),
            depth: 0,
        }
    }

    fn offset_of(&self, rest: &[u8]) -> usize {
        self.end.unwrap_or(0).saturating_sub(rest.len())
    }

    fn truncated(&self, rest: &[u8], what: &str) -> Error {
        Error::StreamTruncated(format!("{} at byte {}", what, self.offset_of(rest)))
    }

    fn unexpected(&self, rest: &[u8], what: impl Into<String>) -> Error {
        Error::stream(self.offset_of(rest), what)
    }

    /// Read one token, translating lexer failures into crate errors.
    fn next_token<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Token<'a>)> {
        match token(input) {
            Ok(ok) => Ok(ok),
            Err(nom::Err::Incomplete(_)) => Err(self.truncated(input, "input ended inside a token")),
            Err(_) => {
                let rest = skip_ws(input);
                let shown = rest.first().map(|&b| b as char).unwrap_or(' ');
                Err(self.unexpected(rest, format!("unexpected character '{}'", shown)))
            },
        }
    }
}

/// Decode escape sequences in PDF literal strings.
///
/// ISO 32000-1:2008, Section 7.3.4.2: `\n \r \t \b \f \( \) \\`, up to three octal
/// digits, and `\<EOL>` line continuation. Unknown escapes drop the backslash.
///
/// # Examples
///
/// ```
/// # use pdf_objgraph::parser::decode_literal_string_escapes;
/// let decoded = decode_literal_string_escapes(b"Section \\247 71.01");
/// assert_eq!(decoded, b"Section \xa7 71.01");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }

        let esc = raw[i + 1];
        i += 2;
        match esc {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(0x08),
            b'f' => result.push(0x0C),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = (esc - b'0') as u32;
                let mut taken = 1;
                while taken < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            i += 1;
                            taken += 1;
                        },
                        _ => break,
                    }
                }
                result.push((value & 0xFF) as u8);
            },
            other => result.push(other),
        }
    }

    result
}

/// Decode hex string digits to bytes. Whitespace is ignored; an odd final digit is
/// padded with 0.
///
/// ```
/// use pdf_objgraph::parser::decode_hex;
///
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes.iter().copied().filter(|c| !is_whitespace(*c)).collect();
    let nibble = |c: u8| {
        (c as char)
            .to_digit(16)
            .map(|v| v as u8)
            .ok_or_else(|| Error::stream(0, format!("invalid hex digit '{}'", c as char)))
    };

    digits
        .chunks(2)
        .map(|pair| {
            let high = nibble(pair[0])?;
            let low = match pair.get(1) {
                Some(&c) => nibble(c)?,
                None => 0,
            };
            Ok((high << 4) | low)
        })
        .collect()
}

/// Parse one PDF object with a detached, permissive context.
///
/// # Example
///
/// ```
/// use pdf_objgraph::parser::parse_object;
///
/// let (remaining, obj) = parse_object(b"[ 1 2 /Name ] rest").unwrap();
/// assert_eq!(obj.as_array().map(|a| a.len()), Some(3));
/// assert_eq!(remaining, b" rest");
/// ```
pub fn parse_object(input: &[u8]) -> Result<(&[u8], Object)> {
    let mut ctx = ParseContext::new(ParserOptions::default());
    parse_object_with(input, &mut ctx)
}

/// Parse one PDF object.
///
/// Consumes exactly the bytes of one value (plus leading whitespace and comments) and
/// returns the rest.
pub fn parse_object_with<'a>(input: &'a [u8], ctx: &mut ParseContext<'_>) -> Result<(&'a [u8], Object)> {
    if ctx.end.is_none() {
        ctx.end = Some(input.len());
    }
    let (rest, tok) = ctx.next_token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Integer(i) => Ok(reference_or_integer(rest, i, ctx)),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(digits) => Ok((rest, Object::String(decode_hex(digits)?))),
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => nested(rest, ctx, parse_array).map(|(rest, items)| (rest, Object::Array(items))),
        Token::DictStart => {
            let (after_dict, dict) = nested(rest, ctx, parse_dictionary)?;
            match token(after_dict) {
                Ok((after_kw, Token::StreamStart)) => parse_stream(after_kw, dict, ctx),
                _ => Ok((after_dict, Object::Dictionary(dict))),
            }
        },
        other => Err(ctx.unexpected(skip_ws(input), format!("unexpected token {:?}", other))),
    }
}

/// `<int> <int> R` with both numbers non-negative and the generation in range is
/// a reference; anything else leaves the first integer alone.
fn reference_or_integer<'a>(rest: &'a [u8], first: i64, ctx: &ParseContext<'_>) -> (&'a [u8], Object) {
    if let (Ok(id), Ok((after_gen, Token::Integer(gen)))) = (u32::try_from(first), token(rest)) {
        if let (Ok(gen), Ok((after_r, Token::R))) = (u16::try_from(gen), token(after_gen)) {
            return (after_r, Object::Reference(ObjectRef::owned(id, gen, ctx.owner)));
        }
    }
    (rest, Object::Integer(first))
}

fn nested<'a, T>(
    input: &'a [u8],
    ctx: &mut ParseContext<'_>,
    inner: fn(&'a [u8], &mut ParseContext<'_>) -> Result<(&'a [u8], T)>,
) -> Result<(&'a [u8], T)> {
    if ctx.depth >= ctx.options.max_nesting {
        return Err(ctx.unexpected(input, format!("nesting deeper than {}", ctx.options.max_nesting)));
    }
    ctx.depth += 1;
    let result = inner(input, ctx);
    ctx.depth -= 1;
    result
}

/// Parse the items of an array after `[`.
fn parse_array<'a>(input: &'a [u8], ctx: &mut ParseContext<'_>) -> Result<(&'a [u8], Vec<Object>)> {
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        let (after, tok) = ctx.next_token(remaining)?;
        if tok == Token::ArrayEnd {
            return Ok((after, items));
        }
        let (after, obj) = parse_object_with(remaining, ctx)?;
        items.push(obj);
        remaining = after;
    }
}

/// Parse the entries of a dictionary after `<<`.
///
/// Duplicate keys keep the first value. Non-name keys and keys without a value are
/// tolerance branches.
fn parse_dictionary<'a>(input: &'a [u8], ctx: &mut ParseContext<'_>) -> Result<(&'a [u8], Dict)> {
    let mut dict = Dict::new();
    let mut remaining = input;

    loop {
        let (after_key, tok) = ctx.next_token(remaining)?;
        let key = match tok {
            Token::DictEnd => return Ok((after_key, dict)),
            Token::Name(key) => key,
            other => {
                ctx.options.tolerate(format!(
                    "Expected name as dictionary key at byte {}, found {:?}",
                    ctx.offset_of(skip_ws(remaining)),
                    other
                ))?;
                remaining = after_key;
                continue;
            },
        };

        if let Ok((_, Token::DictEnd)) = token(after_key) {
            ctx.options
                .tolerate(format!("Dictionary key /{} has no value", key))?;
            dict.entry(key).or_insert(Object::Null);
            remaining = after_key;
            continue;
        }

        let (after_value, value) = parse_object_with(after_key, ctx)?;
        if dict.contains_key(&key) {
            ctx.options.tolerate(format!(
                "Multiple definitions in dictionary at byte {} for key /{}",
                ctx.offset_of(after_key),
                key
            ))?;
        } else {
            dict.insert(key, value);
        }
        remaining = after_value;
    }
}

/// Stream length: a direct integer, or a reference resolved through the context.
fn declared_length(dict: &Dict, ctx: &ParseContext<'_>) -> Result<Option<usize>> {
    let length = match dict.get("Length") {
        Some(Object::Integer(n)) => Some(*n),
        Some(Object::Reference(r)) => match ctx.resolver {
            Some(resolver) => resolver.resolve_reference(*r)?.as_integer(),
            None => None,
        },
        _ => None,
    };
    Ok(length.and_then(|n| usize::try_from(n).ok()))
}

const ENDSTREAM: &[u8] = b"endstream";

/// Parse the payload after the `stream` keyword.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.8.1 - the keyword is followed by CRLF or LF.
///
/// Recovery, in order, when the bytes after `/Length` are not `endstream`:
/// 1. the declared length overshoots by one byte
/// 2. (permissive only) read up to the next known object and find `endstream` there
fn parse_stream<'a>(input: &'a [u8], dict: Dict, ctx: &mut ParseContext<'_>) -> Result<(&'a [u8], Object)> {
    let mut payload = input;
    while payload.first() == Some(&b' ') {
        payload = &payload[1..];
    }
    if payload.starts_with(b"\r\n") {
        payload = &payload[2..];
    } else if payload.starts_with(b"\n") {
        payload = &payload[1..];
    } else if payload.starts_with(b"\r") {
        log::warn!("Stream keyword followed by CR alone at byte {}", ctx.offset_of(payload));
        payload = &payload[1..];
    }

    let length = declared_length(&dict, ctx)?;
    let Some(length) = length else {
        ctx.options.tolerate(format!(
            "Stream at byte {} has no usable /Length",
            ctx.offset_of(payload)
        ))?;
        let (rest, data) = read_unsized(payload, ctx)?;
        return Ok((rest, Object::stream(dict, data)));
    };

    if length <= payload.len() {
        let after = skip_ws(&payload[length..]);
        if after.starts_with(ENDSTREAM) {
            let data = payload[..length].to_vec();
            return Ok((&after[ENDSTREAM.len()..], Object::stream(dict, data)));
        }
        if length >= 1 && payload[length - 1..].starts_with(ENDSTREAM) {
            let data = payload[..length - 1].to_vec();
            return Ok((&payload[length - 1 + ENDSTREAM.len()..], Object::stream(dict, data)));
        }
    } else if find_last(payload, ENDSTREAM).is_none() {
        return Err(ctx.truncated(payload, "stream data"));
    }

    if ctx.options.strict {
        return Err(Error::ReadError(format!(
            "Unable to find 'endstream' marker for stream at byte {}",
            ctx.offset_of(payload)
        )));
    }
    log::warn!(
        "Stream /Length {} at byte {} does not end at 'endstream', reading unsized",
        length,
        ctx.offset_of(payload)
    );
    let (rest, data) = read_unsized(payload, ctx)?;
    Ok((rest, Object::stream(dict, data)))
}

/// Read a stream without trusting its length: look for the last `endstream` before
/// the next known object start (or EOF) and drop the EOL in front of it.
fn read_unsized<'a>(payload: &'a [u8], ctx: &ParseContext<'_>) -> Result<(&'a [u8], Vec<u8>)> {
    let start = ctx.offset_of(payload);
    let window_len = ctx
        .resolver
        .and_then(|r| r.next_object_offset(start))
        .filter(|&next| next > start)
        .map(|next| (next - start).min(payload.len()))
        .unwrap_or(payload.len());
    let window = &payload[..window_len];

    let pos = find_last(window, ENDSTREAM).ok_or_else(|| {
        Error::ReadError(format!("Unable to find 'endstream' marker for stream at byte {}", start))
    })?;

    let mut data = &window[..pos];
    if data.ends_with(b"\r\n") {
        data = &data[..data.len() - 2];
    } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
        data = &data[..data.len() - 1];
    }
    Ok((&payload[pos + ENDSTREAM.len()..], data.to_vec()))
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Parse `<id> <gen> obj`, returning the numbers and the input after `obj`.
pub fn parse_object_header(input: &[u8]) -> Option<(&[u8], u32, u16)> {
    let (rest, id) = match token(input) {
        Ok((rest, Token::Integer(id))) => (rest, u32::try_from(id).ok()?),
        _ => return None,
    };
    let (rest, gen) = match token(rest) {
        Ok((rest, Token::Integer(gen))) => (rest, u16::try_from(gen).ok()?),
        _ => return None,
    };
    match token(rest) {
        Ok((rest, Token::ObjStart)) => Some((rest, id, gen)),
        _ => None,
    }
}

/// Parse a complete indirect object: `<id> <gen> obj <value> endobj`.
///
/// A missing `endobj` is accepted silently, as producers frequently drop it.
pub fn parse_indirect_object<'a>(
    input: &'a [u8],
    ctx: &mut ParseContext<'_>,
) -> Result<(&'a [u8], u32, u16, Object)> {
    if ctx.end.is_none() {
        ctx.end = Some(input.len());
    }
    let (rest, id, gen) = parse_object_header(input)
        .ok_or_else(|| Error::ReadError(format!("Expected object header at byte {}", ctx.offset_of(input))))?;
    let (rest, obj) = parse_object_with(rest, ctx)?;
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => {
            log::debug!("Object {} {} has no endobj", id, gen);
            rest
        },
    };
    Ok((rest, id, gen, obj))
}
