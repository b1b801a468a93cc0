//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of PDF byte streams. The parser in [`crate::parser`] turns
//! tokens into [`Object`](crate::object::Object)s.
//!
//! # PDF Syntax Overview
//!
//! - Numbers: integers (42, -123) and reals (3.14, -2.5, .5)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /Pages)
//! - Keywords: true, false, null, obj, endobj, stream, endstream, R, and any other
//!   run of regular characters
//! - Delimiters: `[`, `]`, `<<`, `>>`
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.
//!
//! Running out of input inside a token is reported as `nom::Err::Incomplete`, which
//! the parser maps to [`Error::StreamTruncated`](crate::error::Error::StreamTruncated).

use nom::{
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::char,
    combinator::value,
    sequence::preceded,
    IResult, Needed,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real (floating-point) number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Literal string bytes, escapes not yet decoded
    LiteralString(&'a [u8]),

    /// Hexadecimal string digits, whitespace included
    HexString(&'a [u8]),

    /// Name with `#XX` escapes decoded (e.g., "Type" from "/Type")
    Name(String),

    /// Boolean true keyword
    True,

    /// Boolean false keyword
    False,

    /// Null keyword
    Null,

    /// Array start delimiter [
    ArrayStart,

    /// Array end delimiter ]
    ArrayEnd,

    /// Dictionary start delimiter <<
    DictStart,

    /// Dictionary end delimiter >>
    DictEnd,

    /// Indirect object start keyword "obj"
    ObjStart,

    /// Indirect object end keyword "endobj"
    ObjEnd,

    /// Stream start keyword "stream"
    StreamStart,

    /// Stream end keyword "endstream"
    StreamEnd,

    /// Reference keyword "R" (used in "10 0 R")
    R,

    /// Any other bare word (e.g. "xref", "trailer", "startxref")
    Keyword(&'a [u8]),
}

/// PDF whitespace (PDF Ref 1.7, Table 3.1).
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters (PDF Ref 1.7, Table 3.2).
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        let start = remaining
            .iter()
            .position(|&c| !is_whitespace(c))
            .unwrap_or(remaining.len());
        remaining = &remaining[start..];
        match comment(remaining) {
            Ok((rest, _)) => remaining = rest,
            Err(_) => return remaining,
        }
    }
}

fn incomplete<'a, T>() -> IResult<&'a [u8], T> {
    Err(nom::Err::Incomplete(Needed::Unknown))
}

/// Parse an integer or real number.
///
/// The token is the longest run of `0-9 + - .`. A run that is not a valid number
/// ("--5", "1.2.3", a lone "-") becomes integer 0 with a warning.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, run) = take_while1(|c: u8| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.'))(input)?;
    // ASCII by construction
    let text = std::str::from_utf8(run).unwrap_or("");

    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().map(Token::Real)
    } else {
        text.parse::<i64>()
            .ok()
            .map(Token::Integer)
            .or_else(|| text.parse::<f64>().ok().map(Token::Real))
    };

    let tok = parsed.unwrap_or_else(|| {
        log::warn!("Invalid number '{}', using 0", text);
        Token::Integer(0)
    });
    Ok((rest, tok))
}

/// Parse a literal string enclosed in parentheses.
///
/// Balanced nested parentheses are part of the string; `\(`, `\)` and `\\` do not
/// count towards the depth. Escapes are left for the parser to decode.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (remaining, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while pos < remaining.len() {
        match remaining[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&remaining[pos + 1..], Token::LiteralString(&remaining[..pos])));
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    incomplete()
}

/// Parse a hexadecimal string enclosed in angle brackets.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (remaining, _) = char('<')(input)?;
    let (after, digits) = take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(remaining)?;
    match after.first() {
        Some(b'>') => Ok((&after[1..], Token::HexString(digits))),
        Some(_) => Err(nom::Err::Error(nom::error::Error::new(after, nom::error::ErrorKind::HexDigit))),
        None => incomplete(),
    }
}

/// Decode #XX escape sequences in PDF names.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.5 - Name Objects
///
/// Escapes are resolved to raw bytes first. The bytes are then read as UTF-8, and
/// as latin-1 when they are not valid UTF-8. Malformed escapes are kept literally.
///
/// # Examples
///
/// ```
/// # use pdf_objgraph::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"Type"), "Type");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// assert_eq!(decode_name_escapes(b"Caf#E9"), "Caf\u{e9}");
/// ```
pub fn decode_name_escapes(name: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(name.len());
    let mut i = 0;
    while i < name.len() {
        if name[i] == b'#' && i + 2 < name.len() {
            let escaped = std::str::from_utf8(&name[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = escaped {
                bytes.push(byte);
                i += 3;
                continue;
            }
        }
        bytes.push(name[i]);
        i += 1;
    }

    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Parse a name starting with /.
///
/// Empty names ("/ ") are accepted.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    Ok((rest, Token::Name(decode_name_escapes(raw))))
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    nom::branch::alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

/// A bare word, classified into the reserved keywords or [`Token::Keyword`].
fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, word) = take_while1(is_regular)(input)?;
    let tok = match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    };
    Ok((rest, tok))
}

/// Parse a single PDF token.
///
/// Skips whitespace and comments, then dispatches on the first byte.
///
/// # Errors
///
/// - `nom::Err::Incomplete` when the input ends before a token is complete
/// - `nom::Err::Error` when the next byte cannot start a token (a stray `)` or `>`)
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    let first = match input.first() {
        Some(&c) => c,
        None => return incomplete(),
    };

    match first {
        b'/' => parse_name(input),
        b'(' => parse_literal_string(input),
        b'<' if input.get(1) == Some(&b'<') => parse_delimiter(input),
        b'<' => parse_hex_string(input),
        b'>' if input.len() == 1 => incomplete(),
        b'>' | b'[' | b']' => parse_delimiter(input),
        b'0'..=b'9' | b'+' | b'-' | b'.' => parse_number(input),
        b'{' | b'}' => Ok((&input[1..], Token::Keyword(&input[..1]))),
        _ => parse_keyword(input),
    }
}

/// Parse tokens until only whitespace and comments remain.
///
/// Trailing whitespace ends the sequence; a token cut off by the end of input is
/// still reported as `nom::Err::Incomplete`.
pub fn tokens(input: &[u8]) -> IResult<&[u8], Vec<Token<'_>>> {
    let mut out = Vec::new();
    let mut remaining = input;
    loop {
        let rest = skip_ws(remaining);
        if rest.is_empty() {
            return Ok((rest, out));
        }
        let (next, tok) = token(rest)?;
        out.push(tok);
        remaining = next;
    }
}
