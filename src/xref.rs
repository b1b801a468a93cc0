//! Cross-reference table parsing.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5.4 (classic tables), 7.5.5 (trailer),
//! 7.5.6 (incremental updates) and 7.5.8 (cross-reference streams).
//!
//! Loading starts at the `startxref` offset and follows `/Prev` links from the
//! newest section to the oldest. The first entry seen for an object wins, and
//! trailer keys set by a newer section are never replaced by an older one.
//!
//! When the pointers cannot be trusted, permissive mode rebuilds the table by
//! scanning the file (see [`crate::xref_reconstruction`]).

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dict, DocumentId, Object};
use crate::parser::{parse_indirect_object, parse_object_header, parse_object_with, ParseContext};
use crate::parser_config::ParserOptions;
use crate::xref_reconstruction::rebuild_xref;
use std::collections::{HashMap, HashSet};

/// Trailer keys taken from a cross-reference stream dictionary.
const STREAM_TRAILER_KEYS: [&str; 5] = ["Root", "Encrypt", "Info", "ID", "Size"];

/// How far back from the end of the file `%%EOF` and `startxref` are searched.
const TAIL_WINDOW: usize = 8 * 1024;

/// Cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free entry; `next` is the next free object number.
    Free { next: u64 },
    /// Object stored directly in the file at `offset`.
    Uncompressed { offset: usize },
    /// Object stored as member `index` of object stream `stream_id` (generation 0).
    Compressed { stream_id: u32, index: u32 },
}

/// Cross-reference table keyed by `(generation, object number)`.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<(u16, u32), XRefEntry>,
    trailer: Dict,
    xref_index: u32,
    rebuilt: bool,
    /// Sorted offsets of uncompressed objects
    offsets: Vec<usize>,
}

impl CrossRefTable {
    /// Create an empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry unless one already exists for the same key.
    ///
    /// Returns false when the entry was dropped because a newer section
    /// already defined the object.
    pub fn insert(&mut self, id: u32, gen: u16, entry: XRefEntry) -> bool {
        match self.entries.entry((gen, id)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            },
        }
    }

    /// Add or replace an entry.
    pub fn set(&mut self, id: u32, gen: u16, entry: XRefEntry) {
        self.entries.insert((gen, id), entry);
    }

    /// Entry for exactly `(id, gen)`.
    pub fn get(&self, id: u32, gen: u16) -> Option<XRefEntry> {
        self.entries.get(&(gen, id)).copied()
    }

    /// Entry used to load `id gen R`.
    ///
    /// Compressed objects always have generation 0, so a compressed entry for the
    /// number matches any requested generation.
    pub fn lookup(&self, id: u32, gen: u16) -> Option<XRefEntry> {
        self.get(id, gen).or_else(|| match self.get(id, 0) {
            Some(entry @ XRefEntry::Compressed { .. }) => Some(entry),
            _ => None,
        })
    }

    /// Number of entries, free entries included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries as `((generation, id), entry)`.
    pub fn iter(&self) -> impl Iterator<Item = ((u16, u32), XRefEntry)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// `(id, generation)` of every in-use object, sorted.
    pub fn object_ids(&self) -> Vec<(u32, u16)> {
        let mut ids: Vec<(u32, u16)> = self
            .entries
            .iter()
            .filter(|(_, e)| !matches!(e, XRefEntry::Free { .. }))
            .map(|(&(gen, id), _)| (id, gen))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Merged trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// First object number of a table that was not zero-indexed (0 otherwise).
    pub fn xref_index(&self) -> u32 {
        self.xref_index
    }

    /// True if the table was produced by scanning the file.
    pub fn is_rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// Smallest known object offset strictly after `pos`.
    pub fn next_object_offset(&self, pos: usize) -> Option<usize> {
        let i = self.offsets.partition_point(|&o| o <= pos);
        self.offsets.get(i).copied()
    }

    pub(crate) fn mark_rebuilt(&mut self) {
        self.rebuilt = true;
    }

    /// Copy keys from a section trailer that no newer section has set.
    pub(crate) fn merge_trailer(&mut self, section: &Dict, keys: Option<&[&str]>) {
        for (key, value) in section {
            if keys.is_some_and(|allowed| !allowed.contains(&key.as_str())) {
                continue;
            }
            self.trailer.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    /// Overwrite trailer keys (rebuild scans the file front to back).
    pub(crate) fn overlay_trailer(&mut self, section: &Dict) {
        for (key, value) in section {
            self.trailer.insert(key.clone(), value.clone());
        }
    }

    pub(crate) fn trailer_mut(&mut self) -> &mut Dict {
        &mut self.trailer
    }

    /// Recompute the offset index after the entries changed.
    pub(crate) fn finish(&mut self) {
        let mut offsets: Vec<usize> = self
            .entries
            .values()
            .filter_map(|e| match e {
                XRefEntry::Uncompressed { offset } => Some(*offset),
                _ => None,
            })
            .collect();
        offsets.sort_unstable();
        offsets.dedup();
        self.offsets = offsets;
    }

    /// Shift a non-zero-indexed table back to zero, one generation at a time.
    ///
    /// A generation is shifted only if every uncompressed entry in it points at an
    /// object header numbered `id - xref_index`. Returns false if an entry does not
    /// point at a readable header at all.
    fn correct_index(&mut self, data: &[u8]) -> bool {
        let shift = self.xref_index;
        let mut by_gen: HashMap<u16, Vec<(u32, usize)>> = HashMap::new();
        for (&(gen, id), entry) in &self.entries {
            if let XRefEntry::Uncompressed { offset } = entry {
                if gen != u16::MAX {
                    by_gen.entry(gen).or_default().push((id, *offset));
                }
            }
        }

        let mut gens: Vec<u16> = by_gen.keys().copied().collect();
        gens.sort_unstable();
        for gen in gens {
            let mut items = by_gen.remove(&gen).unwrap_or_default();
            items.sort_unstable();

            let mut confirmed = true;
            for &(id, offset) in &items {
                let Some((_, header_id, _)) = data.get(offset..).and_then(parse_object_header) else {
                    return false;
                };
                if id.checked_sub(shift) != Some(header_id) {
                    confirmed = false;
                }
            }
            if !confirmed {
                log::debug!("Generation {} of the table is not shifted by {}", gen, shift);
                continue;
            }

            log::warn!("Xref table not zero-indexed; shifting generation {} by {}", gen, shift);
            let moved: Vec<(u32, XRefEntry)> = self
                .entries
                .iter()
                .filter(|&(&(g, _), e)| g == gen && !matches!(e, XRefEntry::Compressed { .. }))
                .map(|(&(_, id), e)| (id, *e))
                .collect();
            for (id, _) in &moved {
                self.entries.remove(&(gen, *id));
            }
            for (id, entry) in moved {
                if let Some(new_id) = id.checked_sub(shift) {
                    self.insert(new_id, gen, entry);
                }
            }
        }
        true
    }
}

/// Outcome of reading one section.
enum Step {
    /// Continue at the `/Prev` offset, or stop.
    Next(Option<usize>),
    /// The offset was wrong; try again at the corrected one.
    Retry(usize),
    /// Give up on the pointers and scan the file.
    Rebuild,
}

/// Load the complete cross-reference table of `data`.
///
/// References in trailers are stamped with `owner`.
///
/// # Errors
///
/// In strict mode any structural problem is a `ReadError`. In permissive mode
/// problems are logged and the table is rebuilt from a scan of the file; an error
/// is returned only if nothing usable is found.
pub fn load_xref(data: &[u8], owner: DocumentId, options: &ParserOptions) -> Result<CrossRefTable> {
    let startxref = match find_startxref(data, options) {
        Ok(offset) => offset,
        Err(e) if !options.strict => {
            log::warn!("{}; rebuilding cross-reference table", e);
            return rebuild_xref(data, owner, options);
        },
        Err(e) => return Err(e),
    };

    let issue = startxref_issue(data, startxref);
    if let Some(issue) = issue {
        if options.strict {
            return Err(Error::ReadError(format!("Broken xref table: {}", issue)));
        }
        log::warn!("Incorrect startxref pointer {}: {}", startxref, issue);
    }

    let mut table = CrossRefTable::new();
    let mut rebuild = read_sections(data, startxref, issue.is_some(), owner, &mut table, options)?;

    if !rebuild && !table.trailer.contains_key("Root") {
        options.tolerate("Trailer has no /Root entry")?;
        rebuild = true;
    }

    if !rebuild && table.xref_index != 0 && !options.strict && !table.correct_index(data) {
        log::warn!("Cannot verify non-zero-indexed xref table against object headers");
        rebuild = true;
    }

    if rebuild {
        let mut rebuilt = rebuild_xref(data, owner, options)?;
        rebuilt.merge_trailer(&table.trailer, None);
        rebuilt.finish();
        return Ok(rebuilt);
    }

    table.finish();
    log::debug!("Loaded {} cross-reference entries", table.len());
    Ok(table)
}

/// Walk the `/Prev` chain from `startxref`. Returns true if the table must be
/// rebuilt instead.
fn read_sections(
    data: &[u8],
    startxref: usize,
    broken_pointer: bool,
    owner: DocumentId,
    table: &mut CrossRefTable,
    options: &ParserOptions,
) -> Result<bool> {
    let mut next = Some(startxref);
    let mut visited = HashSet::new();
    let mut first = true;

    while let Some(offset) = next {
        if !first && offset == 0 {
            options.tolerate("/Prev=0 in the trailer")?;
            break;
        }
        if visited.len() >= options.max_xref_chain {
            options.tolerate(format!(
                "Cross-reference chain longer than {} sections",
                options.max_xref_chain
            ))?;
            break;
        }
        if !visited.insert(offset) {
            options.tolerate(format!("Cross-reference chain loops back to offset {}", offset))?;
            break;
        }

        let step = read_section(data, offset, first && broken_pointer, owner, table, options);
        first = false;
        match step {
            Ok(Step::Next(prev)) => next = prev,
            Ok(Step::Retry(corrected)) => {
                log::warn!("Cross-reference section expected at {} found at {}", offset, corrected);
                next = Some(corrected);
            },
            Ok(Step::Rebuild) => return Ok(true),
            Err(e) if e.is_fatal() || options.strict => return Err(e),
            Err(e) if table.trailer.contains_key("Root") => {
                log::warn!("Previous cross-reference section at {} cannot be read: {}", offset, e);
                break;
            },
            Err(e) => {
                log::warn!("Cross-reference section at {} cannot be read: {}", offset, e);
                return Ok(true);
            },
        }
    }

    Ok(false)
}

/// Dispatch on the byte at `offset`: `x` is a classic table, a digit an object
/// header for a cross-reference stream.
fn read_section(
    data: &[u8],
    offset: usize,
    broken_pointer: bool,
    owner: DocumentId,
    table: &mut CrossRefTable,
    options: &ParserOptions,
) -> Result<Step> {
    let mut pos = offset;
    if matches!(data.get(pos), Some(b'\r' | b'\n')) {
        pos += 1;
    }

    match data.get(pos) {
        Some(b'x') => {
            let section = parse_classic_section(data, pos, owner, table, options)?;
            table.merge_trailer(&section, None);

            if let Some(stm) = section.get("XRefStm").and_then(|o| o.as_integer()) {
                match usize::try_from(stm)
                    .map_err(|_| Error::ReadError(format!("Invalid /XRefStm {}", stm)))
                    .and_then(|stm| parse_xref_stream(data, stm, owner, table, options))
                {
                    Ok(_) => {},
                    Err(e) if options.strict => return Err(e),
                    Err(e) => log::warn!("Hybrid /XRefStm section cannot be read: {}", e),
                }
            }
            Ok(Step::Next(prev_offset(&section)))
        },
        _ if broken_pointer => Ok(Step::Rebuild),
        Some(c) if c.is_ascii_digit() => {
            let section = parse_xref_stream(data, pos, owner, table, options)?;
            table.merge_trailer(&section, Some(&STREAM_TRAILER_KEYS[..]));
            Ok(Step::Next(prev_offset(&section)))
        },
        _ => match relocate_section(data, offset) {
            Some(corrected) => Ok(Step::Retry(corrected)),
            None if options.strict => Err(Error::ReadError(format!(
                "Could not find xref table at specified location {}",
                offset
            ))),
            None => {
                log::warn!("No cross-reference section near offset {}, rebuilding", offset);
                Ok(Step::Rebuild)
            },
        },
    }
}

fn prev_offset(section: &Dict) -> Option<usize> {
    section
        .get("Prev")
        .and_then(|o| o.as_integer())
        .and_then(|p| usize::try_from(p).ok())
}

/// Off-by-a-few correction: look for `xref` in the 20 bytes around `offset`, then
/// for a digit (an object header) in the 25 bytes after it.
fn relocate_section(data: &[u8], offset: usize) -> Option<usize> {
    let lo = offset.saturating_sub(10).min(data.len());
    let hi = offset.saturating_add(10).min(data.len());
    if let Some(i) = find(&data[lo..hi], b"xref") {
        return Some(lo + i);
    }
    (0..25)
        .map(|look| offset + look)
        .find(|&pos| data.get(pos).is_some_and(|c| c.is_ascii_digit()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Find the offset named by the last `startxref`.
///
/// A missing `%%EOF` is tolerated (a truncated file); `startxref 123` on one line is
/// accepted.
pub fn find_startxref(data: &[u8], options: &ParserOptions) -> Result<usize> {
    let tail_start = data.len().saturating_sub(TAIL_WINDOW);
    let tail = &data[tail_start..];

    let search_end = match rfind(tail, b"%%EOF") {
        Some(pos) => pos,
        None => {
            options.tolerate("EOF marker not found")?;
            tail.len()
        },
    };

    let pos = rfind(&tail[..search_end], b"startxref")
        .ok_or_else(|| Error::ReadError("startxref not found".to_string()))?;

    match token(&tail[pos + b"startxref".len()..]) {
        Ok((_, Token::Integer(offset))) => usize::try_from(offset)
            .map_err(|_| Error::ReadError(format!("startxref offset {} is negative", offset))),
        _ => Err(Error::ReadError("startxref is not followed by an offset".to_string())),
    }
}

/// Check that `offset` plausibly starts a cross-reference section: whitespace
/// before it, then `xref` or `<digits> <digits> obj`.
fn startxref_issue(data: &[u8], offset: usize) -> Option<&'static str> {
    if offset == 0 {
        return Some("startxref is 0");
    }
    let mut pos = offset - 1;
    if data.get(pos) == Some(&b'j') {
        pos += 1;
    }
    if !matches!(data.get(pos), Some(b'\r' | b'\n' | b' ' | b'\t')) {
        return Some("no whitespace before the cross-reference section");
    }
    pos += 1;

    let rest = data.get(pos..).unwrap_or(&[]);
    if rest.starts_with(b"xref") {
        return None;
    }
    let header_len = rest
        .iter()
        .position(|c| !(c.is_ascii_digit() || *c == b' ' || *c == b'\t'))
        .unwrap_or(rest.len());
    match rest.get(header_len..header_len + 3) {
        None => Some("file ends inside the cross-reference section header"),
        Some(kw) if kw.eq_ignore_ascii_case(b"obj") => None,
        Some(_) => Some("neither 'xref' nor an object header at startxref"),
    }
}

/// Parse a classic `xref` section starting at `pos` and return its trailer.
///
/// Records are fixed 20-byte lines `oooooooooo ggggg n\r\n`; producers using a
/// single-byte EOL or a stray extra EOL byte are tolerated.
pub fn parse_classic_section(
    data: &[u8],
    pos: usize,
    owner: DocumentId,
    table: &mut CrossRefTable,
    options: &ParserOptions,
) -> Result<Dict> {
    if !data[pos..].starts_with(b"xref") {
        return Err(Error::ReadError(format!("xref table read error at byte {}", pos)));
    }
    let mut cursor = skip_ws(&data[pos + 4..]);
    let mut first_subsection = true;
    let mut prev_end: u64 = 0;

    loop {
        let (after_start, start) = match token(cursor) {
            Ok((rest, Token::Integer(n))) if n >= 0 => (rest, n as u64),
            Ok((rest, Token::Keyword(b"trailer"))) => {
                cursor = rest;
                break;
            },
            _ => {
                return Err(Error::ReadError(format!(
                    "Invalid/Truncated xref table at byte {}",
                    data.len() - cursor.len()
                )))
            },
        };
        let (after_count, count) = match token(after_start) {
            Ok((rest, Token::Integer(n))) if n >= 0 => (rest, n as u64),
            _ => {
                return Err(Error::ReadError(format!(
                    "Invalid/Truncated xref subsection header at byte {}",
                    data.len() - after_start.len()
                )))
            },
        };

        if first_subsection && start != 0 {
            table.xref_index = u32::try_from(start).unwrap_or(0);
            log::debug!("Xref table starts at object {}", start);
        }
        if !first_subsection && start < prev_end {
            options.tolerate(format!("Cross-reference subsection {} {} overlaps the previous one", start, count))?;
        }
        first_subsection = false;
        prev_end = start.saturating_add(count);

        let mut at = data.len() - skip_ws(after_count).len();
        for n in 0..count {
            let id = u32::try_from(start + n)
                .map_err(|_| Error::ReadError(format!("Object number {} out of range", start + n)))?;
            at = read_record(data, at, id, table, options)?;
        }
        cursor = skip_ws(&data[at.min(data.len())..]);
    }

    let mut ctx = ParseContext::for_document(owner, *options, None, data.len());
    match parse_object_with(cursor, &mut ctx)? {
        (_, Object::Dictionary(trailer)) => Ok(trailer),
        (_, other) => Err(Error::ReadError(format!("Trailer is a {}, not a dictionary", other.type_name()))),
    }
}

/// Read one 20-byte record at `at`; returns the position of the next one.
fn read_record(data: &[u8], mut at: usize, id: u32, table: &mut CrossRefTable, options: &ParserOptions) -> Result<usize> {
    while matches!(data.get(at), Some(b'\r' | b'\n')) {
        at += 1;
    }
    let line = &data[at.min(data.len())..(at + 20).min(data.len())];
    if line.is_empty() {
        return Err(Error::ReadError("Unexpected empty line in Xref table".to_string()));
    }

    // A record ending in a digit or 't' ran into the next record or "trailer"
    let advance = if line.len() == 20 && matches!(line[19], b'0'..=b'9' | b't') {
        19
    } else {
        20
    };

    let invalid = || Error::ReadError(format!("Invalid xref record for object {} at byte {}", id, at));
    let mut fields = line[..line.len().min(16)].split(|&c| c == b' ');
    let (Some(offset), Some(gen), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(invalid());
    };
    let offset: u64 = ascii_number(offset).ok_or_else(invalid)?;
    let gen: u16 = ascii_number(gen).ok_or_else(invalid)?;

    let entry = match line.get(17) {
        Some(b'n') => Some(XRefEntry::Uncompressed {
            offset: usize::try_from(offset).map_err(|_| invalid())?,
        }),
        Some(b'f') => Some(XRefEntry::Free { next: offset }),
        other => {
            options.tolerate(format!(
                "Unknown xref entry type {:?} for object {}",
                other.map(|&c| c as char),
                id
            ))?;
            None
        },
    };
    if let Some(entry) = entry {
        table.insert(id, gen, entry);
    }

    Ok(at + advance)
}

fn ascii_number<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Parse a cross-reference stream at `pos` and add its entries to `table`.
///
/// Returns the stream dictionary, which doubles as the section trailer.
pub fn parse_xref_stream(
    data: &[u8],
    pos: usize,
    owner: DocumentId,
    table: &mut CrossRefTable,
    options: &ParserOptions,
) -> Result<Dict> {
    let input = data
        .get(pos..)
        .ok_or_else(|| Error::ReadError(format!("Cross-reference stream offset {} beyond EOF", pos)))?;
    let mut ctx = ParseContext::for_document(owner, *options, None, data.len());
    let (_, id, gen, stream) = parse_indirect_object(input, &mut ctx)?;

    let dict = match &stream {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::ReadError(format!(
                "Object {} {} at {} is a {}, not a cross-reference stream",
                id,
                gen,
                pos,
                other.type_name()
            )))
        },
    };
    if dict.get("Type").and_then(|t| t.as_name()) != Some("XRef") {
        return Err(Error::ReadError(format!(
            "Unexpected type {:?} for cross-reference stream {} {}",
            dict.get("Type"),
            id,
            gen
        )));
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|w| w.as_array())
        .map(|w| {
            w.iter()
                .map(|o| o.as_integer().and_then(|n| usize::try_from(n).ok()).unwrap_or(0))
                .collect()
        })
        .unwrap_or_default();
    if widths.len() < 3 {
        return Err(Error::ReadError(format!("Cross-reference stream /W has {} fields", widths.len())));
    }
    if widths.len() > 3 {
        options.tolerate(format!("Too many entry sizes in /W: {:?}", widths))?;
    }
    if widths.iter().any(|&w| w > 8) {
        return Err(Error::ReadError(format!("Cross-reference stream /W {:?} too wide", widths)));
    }

    let size = dict.get("Size").and_then(|s| s.as_integer()).unwrap_or(0);
    let index: Vec<i64> = match dict.get("Index").and_then(|i| i.as_array()) {
        Some(arr) => arr.iter().filter_map(|o| o.as_integer()).collect(),
        None => vec![0, size],
    };

    let rows = stream.get_data_with_limit(options.max_decompressed_size)?;
    let row_len: usize = widths.iter().sum();
    let mut at = 0;
    let mut prev_end = 0i64;

    for pair in index.chunks(2) {
        let &[start, count] = pair else {
            options.tolerate("Odd number of values in /Index")?;
            break;
        };
        if start < 0 || count < 0 {
            options.tolerate(format!("Negative /Index subsection {} {}", start, count))?;
            continue;
        }
        if start < prev_end {
            options.tolerate(format!("Cross-reference stream subsection {} {} overlaps the previous one", start, count))?;
        }
        let end = start.saturating_add(count);
        prev_end = end;

        for num in start..end {
            if at + row_len > rows.len() {
                options.tolerate(format!("Cross-reference stream {} {} ends before object {}", id, gen, num))?;
                return Ok(dict.clone());
            }
            let row = &rows[at..at + row_len];
            at += row_len;

            let field = |i: usize| -> u64 {
                let offset: usize = widths[..i].iter().sum();
                match widths[i] {
                    0 if i == 0 => 1,
                    0 => 0,
                    w => read_int(&row[offset..offset + w]),
                }
            };
            let Ok(num) = u32::try_from(num) else { continue };

            match field(0) {
                0 => {
                    table.insert(num, u16::try_from(field(2)).unwrap_or(u16::MAX), XRefEntry::Free { next: field(1) });
                },
                1 => {
                    let gen = u16::try_from(field(2)).unwrap_or(u16::MAX);
                    if let Ok(offset) = usize::try_from(field(1)) {
                        table.insert(num, gen, XRefEntry::Uncompressed { offset });
                    }
                },
                2 => {
                    if let (Ok(stream_id), Ok(index)) = (u32::try_from(field(1)), u32::try_from(field(2))) {
                        table.insert(num, 0, XRefEntry::Compressed { stream_id, index });
                    }
                },
                other => options.tolerate(format!("Unknown xref type {} for object {}", other, num))?,
            }
        }
    }

    Ok(dict.clone())
}

/// Read a big-endian unsigned integer.
fn read_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
