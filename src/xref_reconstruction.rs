//! Cross-reference table reconstruction for damaged PDFs.
//!
//! When the cross-reference pointers are wrong or the sections are unreadable,
//! the table is rebuilt by scanning the whole file:
//!
//! 1. every `<id> <gen> obj` header; a later definition of a number replaces an
//!    earlier one
//! 2. every `/Type /ObjStm` object found that way, registering its members
//! 3. every `trailer << ... >>`, later keys over earlier ones
//!
//! If no trailer names a `/Root`, one is synthesized from the `/Type /Catalog`
//! object.
//!
//! This is a fallback used only in permissive mode.

use crate::error::{Error, Result};
use crate::object::{Dict, DocumentId, Object, ObjectRef, ObjectResolver};
use crate::objstm::ObjectStream;
use crate::parser::{parse_indirect_object, parse_object_with, ParseContext};
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::rc::Rc;

lazy_static! {
    /// An object header preceded by whitespace
    static ref RE_OBJ_HEADER: Regex = Regex::new(r"[\r\n \t][ \t]*(\d+)[ \t]+(\d+)[ \t]+obj").unwrap();

    /// A trailer keyword; group 1 is the dictionary start
    static ref RE_TRAILER: Regex = Regex::new(r"[\r\n \t][ \t]*trailer[\r\n \t]*(<<)").unwrap();
}

/// Resolver used while scanning: indirect `/Length` values are read straight from
/// the partially rebuilt table, and unsized streams stop at the next header.
struct ScanResolver<'a> {
    data: &'a [u8],
    table: &'a CrossRefTable,
    owner: DocumentId,
    options: ParserOptions,
}

impl ObjectResolver for ScanResolver<'_> {
    fn resolve_reference(&self, obj_ref: ObjectRef) -> Result<Rc<Object>> {
        let Some(XRefEntry::Uncompressed { offset }) = self.table.get(obj_ref.id, obj_ref.gen) else {
            return Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen));
        };
        // Lengths are plain integers; no resolver needed below this level
        let mut ctx = ParseContext::for_document(self.owner, self.options, None, self.data.len());
        let (_, _, _, obj) = parse_indirect_object(&self.data[offset..], &mut ctx)?;
        Ok(Rc::new(obj))
    }

    fn next_object_offset(&self, pos: usize) -> Option<usize> {
        self.table.next_object_offset(pos)
    }
}

/// Rebuild the cross-reference table of `data` from scratch.
///
/// # Errors
///
/// Returns `ReadError` if the file contains no object headers at all.
pub fn rebuild_xref(data: &[u8], owner: DocumentId, options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Rebuilding cross-reference table by scanning {} bytes", data.len());

    let mut table = CrossRefTable::new();
    table.mark_rebuilt();

    for caps in RE_OBJ_HEADER.captures_iter(data) {
        let (Some(id_match), Some(gen_match)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let (Some(id), Some(gen)) = (ascii_number::<u32>(id_match.as_bytes()), ascii_number::<u16>(gen_match.as_bytes()))
        else {
            log::warn!("Skipping out-of-range object header at byte {}", id_match.start());
            continue;
        };
        table.set(id, gen, XRefEntry::Uncompressed { offset: id_match.start() });
    }

    if table.is_empty() {
        return Err(Error::ReadError("No objects found while rebuilding cross-reference table".to_string()));
    }
    table.finish();
    log::debug!("Found {} object headers, parsing for object streams", table.len());

    let found = scan_objects(data, &table, owner, options);
    for (stream_id, members) in &found.object_streams {
        for (index, &(id, _)) in members.iter().enumerate() {
            let Ok(index) = u32::try_from(index) else { break };
            table.insert(id, 0, XRefEntry::Compressed { stream_id: *stream_id, index });
        }
    }

    let mut ctx = ParseContext::for_document(owner, *options, None, data.len());
    for caps in RE_TRAILER.captures_iter(data) {
        let Some(start) = caps.get(1).map(|m| m.start()) else { continue };
        match parse_object_with(&data[start..], &mut ctx) {
            Ok((_, Object::Dictionary(trailer))) => table.overlay_trailer(&trailer),
            Ok(_) => {},
            Err(e) => log::warn!("Skipping unreadable trailer at byte {}: {}", start, e),
        }
    }

    if !table.trailer().contains_key("Root") {
        for dict in &found.xref_streams {
            table.merge_trailer(dict, Some(&["Root", "Info", "ID", "Encrypt"]));
        }
    }
    if !table.trailer().contains_key("Root") {
        match found.catalog {
            Some(catalog) => {
                log::warn!("No trailer found, using catalog {} as /Root", catalog);
                table.trailer_mut().insert("Root".to_string(), Object::Reference(catalog));
            },
            None => log::warn!("Rebuilt table has no catalog"),
        }
    }
    if !table.trailer().contains_key("Size") {
        let size = table.object_ids().iter().map(|&(id, _)| id).max().unwrap_or(0) as i64 + 1;
        table.trailer_mut().insert("Size".to_string(), Object::Integer(size));
    }

    table.finish();
    log::info!("Rebuilt cross-reference table with {} entries", table.len());
    Ok(table)
}

#[derive(Default)]
struct ScanResult {
    /// Object stream number and its header pairs, in file order
    object_streams: Vec<(u32, Vec<(u32, usize)>)>,
    /// Dictionaries of `/Type /XRef` streams, in file order
    xref_streams: Vec<Dict>,
    /// Last `/Type /Catalog` object
    catalog: Option<ObjectRef>,
}

/// Parse every object found by the header scan, looking for object streams,
/// cross-reference streams and the catalog.
fn scan_objects(data: &[u8], table: &CrossRefTable, owner: DocumentId, options: &ParserOptions) -> ScanResult {
    let resolver = ScanResolver {
        data,
        table,
        owner,
        options: *options,
    };
    let mut located: Vec<(usize, u32, u16)> = table
        .iter()
        .filter_map(|((gen, id), e)| match e {
            XRefEntry::Uncompressed { offset } => Some((offset, id, gen)),
            _ => None,
        })
        .collect();
    located.sort_unstable();

    let mut result = ScanResult::default();
    for (offset, id, gen) in located {
        let mut ctx = ParseContext::for_document(owner, *options, Some(&resolver), data.len());
        let obj = match parse_indirect_object(&data[offset..], &mut ctx) {
            Ok((_, _, _, obj)) => obj,
            Err(e) => {
                log::debug!("Object {} {} at byte {} unreadable during rebuild: {}", id, gen, offset, e);
                continue;
            },
        };
        match obj.get("Type").and_then(|t| t.as_name()) {
            Some("ObjStm") => match ObjectStream::parse(&obj, options) {
                Ok(objstm) => result.object_streams.push((id, objstm.pairs().to_vec())),
                Err(e) => log::warn!("Object stream {} {} unreadable during rebuild: {}", id, gen, e),
            },
            Some("XRef") => {
                if let Some(dict) = obj.as_dict() {
                    result.xref_streams.push(dict.clone());
                }
            },
            Some("Catalog") => result.catalog = Some(ObjectRef::owned(id, gen, owner)),
            _ => {},
        }
    }
    result
}

fn ascii_number<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}
