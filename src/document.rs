//! PDF document model: the lazy, memoizing object store.
//!
//! A [`PdfDocument`] holds the whole file in memory, the merged cross-reference
//! table and a cache of every object loaded so far. Objects are parsed on first
//! access and the same `Rc` is handed out on every later access.
//!
//! Loading follows the document's [`ParserOptions`]: strict mode raises on every
//! structural irregularity, permissive mode logs it and repairs what it can.

use crate::encryption::{EncryptDict, PasswordStatus, SecurityHandler};
use crate::error::{Error, Result};
use crate::object::{Dict, DocumentId, Object, ObjectRef, ObjectResolver};
use crate::objstm::ObjectStream;
use crate::parser::{parse_object_header, parse_object_with, ParseContext};
use crate::parser_config::ParserOptions;
use crate::xref::{load_xref, CrossRefTable, XRefEntry};
use bytes::Bytes;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

/// Page attributes that a page inherits from its ancestors when it does not set them.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.7.3.4 - Inheritance of Page Attributes
pub const INHERITABLE_PAGE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Number of leading bytes searched for `%PDF-` in permissive mode.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF document.
///
/// This structure represents an open PDF document, providing access to:
/// - Document metadata (version, trailer, cross-reference table)
/// - Object loading and dereferencing
/// - Page tree traversal
///
/// # Example
///
/// ```no_run
/// use pdf_objgraph::document::PdfDocument;
///
/// let doc = PdfDocument::open("sample.pdf")?;
/// println!("PDF version: {}.{}", doc.version().0, doc.version().1);
/// println!("Page count: {}", doc.page_count()?);
/// # Ok::<(), pdf_objgraph::error::Error>(())
/// ```
pub struct PdfDocument {
    id: DocumentId,
    data: Bytes,
    /// PDF version (major, minor)
    version: (u8, u8),
    xref: CrossRefTable,
    options: ParserOptions,
    /// Loaded objects keyed by (generation, id)
    object_cache: RefCell<HashMap<(u16, u32), Rc<Object>>>,
    /// Decoded object streams keyed by object number
    objstm_cache: RefCell<HashMap<u32, Rc<ObjectStream>>>,
    /// Objects currently being resolved (for cycle detection)
    resolving_stack: RefCell<HashSet<(u16, u32)>>,
    recursion_depth: Cell<u32>,
    /// The `/Encrypt` dictionary's own reference; it is never decrypted
    encrypt_ref: Option<ObjectRef>,
    security_handler: Option<Box<dyn SecurityHandler>>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("xref_entries", &self.xref.len())
            .field("cached_objects", &self.object_cache.borrow().len())
            .field("strict", &self.options.strict)
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Open a PDF document from a file path with permissive options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or no cross-reference data can be
    /// recovered from it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ParserOptions::default())
    }

    /// Open a PDF document from a file path.
    pub fn open_with_options(path: impl AsRef<Path>, options: ParserOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        log::debug!("Opened {} ({} bytes)", path.as_ref().display(), data.len());
        Self::from_bytes_with_options(data, options)
    }

    /// Read a whole document from `reader` with permissive options.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Load a document held in memory with permissive options.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_bytes_with_options(data, ParserOptions::default())
    }

    /// Load a document held in memory.
    ///
    /// This function:
    /// 1. Validates the `%PDF-` header and reads the version
    /// 2. Locates and merges every cross-reference section
    /// 3. Falls back to rebuilding the table by scanning (permissive mode only)
    pub fn from_bytes_with_options(data: impl Into<Bytes>, options: ParserOptions) -> Result<Self> {
        let data: Bytes = data.into();
        if data.is_empty() {
            return Err(Error::ReadError("Cannot read an empty file".to_string()));
        }
        if options.max_file_size > 0 && data.len() > options.max_file_size {
            return Err(Error::ReadError(format!(
                "File is {} bytes, limit is {}",
                data.len(),
                options.max_file_size
            )));
        }

        let version = parse_header(&data, &options)?;
        let id = DocumentId::next();
        let xref = load_xref(&data, id, &options)?;

        let encrypt_ref = xref.trailer().get("Encrypt").and_then(|e| e.as_reference());
        if xref.trailer().contains_key("Encrypt") {
            log::info!("Document is encrypted; install a security handler and call decrypt()");
        }
        log::debug!(
            "Loaded PDF {}.{} with {} cross-reference entries{}",
            version.0,
            version.1,
            xref.len(),
            if xref.is_rebuilt() { " (rebuilt)" } else { "" }
        );

        Ok(Self {
            id,
            data,
            version,
            xref,
            options,
            object_cache: RefCell::new(HashMap::new()),
            objstm_cache: RefCell::new(HashMap::new()),
            resolving_stack: RefCell::new(HashSet::new()),
            recursion_depth: Cell::new(0),
            encrypt_ref,
            security_handler: None,
        })
    }

    /// Process-unique identity of this document; stamped on every reference it parses.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Get the PDF version (major, minor) from the header.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Merged trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        self.xref.trailer()
    }

    /// Merged cross-reference table.
    pub fn xref(&self) -> &CrossRefTable {
        &self.xref
    }

    /// Options this document was opened with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Raw file bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// True if the trailer has an `/Encrypt` entry.
    pub fn is_encrypted(&self) -> bool {
        self.trailer().contains_key("Encrypt")
    }

    /// The parsed `/Encrypt` dictionary, if any.
    pub fn encrypt_dict(&self) -> Result<Option<EncryptDict>> {
        match self.trailer().get("Encrypt") {
            Some(entry) => Ok(Some(EncryptDict::from_object(&self.resolve(entry)?)?)),
            None => Ok(None),
        }
    }

    /// First element of the trailer's `/ID` array.
    pub fn file_id(&self) -> Option<Vec<u8>> {
        self.trailer()
            .get("ID")
            .and_then(|id| id.as_array())
            .and_then(|a| a.first())
            .and_then(|first| first.as_string())
            .map(|s| s.to_vec())
    }

    /// Install the handler used to decrypt strings and streams.
    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) {
        self.security_handler = Some(handler);
    }

    /// Authenticate `password` with the installed security handler.
    ///
    /// # Errors
    ///
    /// `ReadError` if the document is not encrypted, no handler is installed, or the
    /// password matches neither the user nor the owner password.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<PasswordStatus> {
        if !self.is_encrypted() {
            return Err(Error::ReadError("Not an encrypted file".to_string()));
        }
        let handler = self
            .security_handler
            .as_mut()
            .ok_or_else(|| Error::ReadError("No security handler installed".to_string()))?;
        match handler.authenticate(password)? {
            PasswordStatus::NotDecrypted => Err(Error::ReadError("Wrong password".to_string())),
            status => {
                log::info!("Authenticated as {:?}", status);
                Ok(status)
            },
        }
    }

    /// Load an object by its reference.
    ///
    /// This function:
    /// 1. Checks the object cache first
    /// 2. If not cached, looks the object up in the cross-reference table
    /// 3. Parses it from the file or from its object stream
    /// 4. Decrypts it if the document is encrypted
    /// 5. Caches the result; later calls return the same `Rc`
    ///
    /// # Errors
    ///
    /// - `InvalidObjectType` for a reference owned by another document
    /// - `CircularReference` / `RecursionLimitExceeded` from the resolution guards
    /// - `ReadError` for structural problems in strict mode, or when the document is
    ///   encrypted and has not been decrypted
    pub fn get_object(&self, obj_ref: ObjectRef) -> Result<Rc<Object>> {
        if !obj_ref.owner.is_detached() && obj_ref.owner != self.id {
            return Err(Error::InvalidObjectType {
                expected: format!("reference into document {:?}", self.id),
                found: format!("{} from document {:?}", obj_ref, obj_ref.owner),
            });
        }

        let key = obj_ref.key();
        if let Some(cached) = self.object_cache.borrow().get(&key) {
            return Ok(Rc::clone(cached));
        }

        let depth = self.recursion_depth.get();
        if depth >= self.options.max_recursion_depth {
            log::error!(
                "Recursion depth limit exceeded ({}) while loading object {}",
                self.options.max_recursion_depth,
                obj_ref
            );
            return Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth));
        }
        if !self.resolving_stack.borrow_mut().insert(key) {
            log::error!("Circular reference detected for object {}", obj_ref);
            return Err(Error::CircularReference(obj_ref));
        }

        self.recursion_depth.set(depth + 1);
        let result = self.load_object(obj_ref);
        self.recursion_depth.set(depth);
        self.resolving_stack.borrow_mut().remove(&key);

        let obj = result?;
        let mut cache = self.object_cache.borrow_mut();
        Ok(Rc::clone(cache.entry(key).or_insert_with(|| Rc::new(obj))))
    }

    /// Put `obj` into the cache under `obj_ref`.
    ///
    /// Replacing an entry with different content is an error in strict mode and a
    /// warning otherwise.
    pub fn cache_object(&self, obj_ref: ObjectRef, obj: Object) -> Result<Rc<Object>> {
        let key = obj_ref.key();
        let mut cache = self.object_cache.borrow_mut();
        if let Some(existing) = cache.get(&key) {
            if **existing == obj {
                return Ok(Rc::clone(existing));
            }
            self.options
                .tolerate(format!("Overwriting cache for {} {}", obj_ref.gen, obj_ref.id))?;
        }
        let obj = Rc::new(obj);
        cache.insert(key, Rc::clone(&obj));
        Ok(obj)
    }

    fn load_object(&self, obj_ref: ObjectRef) -> Result<Object> {
        let obj = match self.xref.lookup(obj_ref.id, obj_ref.gen) {
            Some(XRefEntry::Compressed { stream_id, index }) => {
                log::trace!("Object {} is member {} of object stream {}", obj_ref, index, stream_id);
                // Members of object streams are decrypted with their stream
                return self.load_compressed_object(obj_ref, stream_id, index);
            },
            Some(XRefEntry::Uncompressed { offset }) => self.load_uncompressed_object(obj_ref, offset)?,
            Some(XRefEntry::Free { .. }) => {
                log::debug!("Object {} is free", obj_ref);
                return Ok(Object::Null);
            },
            None => match self.find_object_offset(obj_ref) {
                Some(offset) if !self.options.strict => {
                    log::warn!("Object {} not in xref table, found at byte {}", obj_ref, offset);
                    self.load_uncompressed_object(obj_ref, offset)?
                },
                _ => {
                    self.options
                        .tolerate(format!("Object {} not defined", obj_ref))?;
                    return Ok(Object::Null);
                },
            },
        };

        self.decrypt_loaded(obj_ref, obj)
    }

    fn decrypt_loaded(&self, obj_ref: ObjectRef, obj: Object) -> Result<Object> {
        if !self.is_encrypted() || self.encrypt_ref.is_some_and(|e| e.key() == obj_ref.key()) {
            return Ok(obj);
        }
        match &self.security_handler {
            Some(handler) if handler.is_authenticated() => handler.decrypt_object(obj, obj_ref.id, obj_ref.gen),
            _ => Err(Error::ReadError("File has not been decrypted".to_string())),
        }
    }

    /// Parse `id gen obj <value>` at `offset`.
    fn load_uncompressed_object(&self, obj_ref: ObjectRef, offset: usize) -> Result<Object> {
        let input = self.data.get(offset..).unwrap_or(&[]);

        let (mut rest, id, gen) = match parse_object_header(input) {
            Some(header) => header,
            None => {
                let repaired = if self.options.strict {
                    None
                } else {
                    self.find_object_offset(obj_ref)
                        .and_then(|at| parse_object_header(&self.data[at..]))
                };
                match repaired {
                    Some(header) => {
                        log::warn!("Object {} not at byte {}, found by scanning", obj_ref, offset);
                        header
                    },
                    None => {
                        self.options.tolerate(format!(
                            "Invalid object header for {} at byte {}",
                            obj_ref, offset
                        ))?;
                        return Ok(Object::Null);
                    },
                }
            },
        };

        if id != obj_ref.id {
            if self.xref.xref_index() != 0 && !self.options.strict {
                log::trace!("Object {} read as {}; table not zero-indexed", obj_ref, id);
            } else if self.xref.xref_index() != 0 {
                return Err(Error::ReadError(format!(
                    "Expected object ID ({} {}) does not match actual ({} {}); xref table not zero-indexed",
                    obj_ref.id, obj_ref.gen, id, gen
                )));
            } else {
                self.options.tolerate(format!(
                    "Expected object ID ({} {}) does not match actual ({} {})",
                    obj_ref.id, obj_ref.gen, id, gen
                ))?;
                let found = self
                    .find_object_offset(obj_ref)
                    .and_then(|at| parse_object_header(&self.data[at..]))
                    .filter(|&(_, found_id, _)| found_id == obj_ref.id);
                match found {
                    Some((found_rest, _, _)) => {
                        log::warn!("Object {} not at byte {}, found by scanning", obj_ref, offset);
                        rest = found_rest;
                    },
                    None => log::warn!("No header for {} in the file; using object {}", obj_ref, id),
                }
            }
        } else if gen != obj_ref.gen && self.options.strict {
            return Err(Error::ReadError(format!(
                "Expected generation {} for object {}, found {}",
                obj_ref.gen, obj_ref.id, gen
            )));
        }

        let mut ctx = ParseContext::for_document(self.id, self.options, Some(self), self.data.len());
        match parse_object_with(rest, &mut ctx) {
            Ok((_, obj)) => Ok(obj),
            Err(e) if e.is_fatal() || self.options.strict => Err(e),
            Err(e) => {
                log::warn!("Cannot read object {}: {}; using null", obj_ref, e);
                Ok(Object::Null)
            },
        }
    }

    fn load_compressed_object(&self, obj_ref: ObjectRef, stream_id: u32, index: u32) -> Result<Object> {
        let objstm = self.object_stream(stream_id)?;
        objstm.parse_member(obj_ref.id, index, self.id, &self.options)
    }

    /// Decoded object stream `stream_id`, loaded through the store.
    fn object_stream(&self, stream_id: u32) -> Result<Rc<ObjectStream>> {
        if let Some(cached) = self.objstm_cache.borrow().get(&stream_id) {
            return Ok(Rc::clone(cached));
        }
        let stream = self.get_object(ObjectRef::owned(stream_id, 0, self.id))?;
        let objstm = Rc::new(ObjectStream::parse(&stream, &self.options)?);
        self.objstm_cache
            .borrow_mut()
            .insert(stream_id, Rc::clone(&objstm));
        Ok(objstm)
    }

    /// Scan the file for the last `id gen obj` header.
    fn find_object_offset(&self, obj_ref: ObjectRef) -> Option<usize> {
        let pattern = format!(r"\s{}\s+{}\s+obj", obj_ref.id, obj_ref.gen);
        let re = regex::bytes::Regex::new(&pattern).ok()?;
        re.find_iter(&self.data).last().map(|m| m.start() + 1)
    }

    /// Resolve `obj`, following chains of references.
    pub fn resolve(&self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        for _ in 0..self.options.max_recursion_depth {
            match current {
                Object::Reference(r) => current = self.get_object(r)?.as_ref().clone(),
                other => return Ok(other),
            }
        }
        Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth))
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> Result<Rc<Object>> {
        let root = match self.trailer().get("Root") {
            Some(Object::Reference(r)) => self.get_object(*r)?,
            Some(other) => {
                self.options.tolerate("/Root is not an indirect reference")?;
                Rc::new(other.clone())
            },
            None => return Err(Error::ReadError("Trailer missing /Root entry".to_string())),
        };
        if root.as_dict().is_none() {
            return Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: root.type_name().to_string(),
            });
        }
        Ok(root)
    }

    /// The page tree root reference from the catalog.
    fn pages_root(&self) -> Result<ObjectRef> {
        self.catalog()?
            .get("Pages")
            .and_then(|p| p.as_reference())
            .ok_or_else(|| Error::ReadError("Catalog missing /Pages reference".to_string()))
    }

    /// References of every page, in document order.
    ///
    /// The walk is guarded against cycles and excessive depth; both are errors in
    /// strict mode and skipped branches otherwise.
    pub fn page_refs(&self) -> Result<Vec<ObjectRef>> {
        let root = self.pages_root()?;
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, 0, &mut visited, &mut pages)?;

        if let Some(count) = self.get_object(root)?.get("Count").and_then(|c| c.as_integer()) {
            if count != pages.len() as i64 {
                log::debug!("Page tree /Count is {} but {} pages were found", count, pages.len());
            }
        }
        Ok(pages)
    }

    fn collect_pages(
        &self,
        node_ref: ObjectRef,
        depth: u32,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<ObjectRef>,
    ) -> Result<()> {
        if depth > self.options.max_recursion_depth {
            self.options
                .tolerate(format!("Page tree deeper than {} levels", self.options.max_recursion_depth))?;
            return Ok(());
        }
        if !visited.insert(node_ref) {
            self.options
                .tolerate(format!("Page tree node {} visited twice", node_ref))?;
            return Ok(());
        }

        let node = match self.get_object(node_ref) {
            Ok(node) => node,
            Err(e) if e.is_fatal() || self.options.strict => return Err(e),
            Err(e) => {
                log::warn!("Failed to load page tree node {}: {}", node_ref, e);
                return Ok(());
            },
        };
        let Some(dict) = node.as_dict() else {
            self.options
                .tolerate(format!("Page tree node {} is not a dictionary", node_ref))?;
            return Ok(());
        };

        let is_pages = match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => true,
            Some("Page") => false,
            _ => dict.contains_key("Kids"),
        };
        if !is_pages {
            pages.push(node_ref);
            return Ok(());
        }

        let kids = match dict.get("Kids") {
            Some(kids) => self.resolve(kids)?,
            None => Object::Array(Vec::new()),
        };
        for kid in kids.as_array().map(|k| k.as_slice()).unwrap_or(&[]) {
            match kid.as_reference() {
                Some(kid_ref) => self.collect_pages(kid_ref, depth + 1, visited, pages)?,
                None => self
                    .options
                    .tolerate(format!("Non-reference entry in /Kids of {}", node_ref))?,
            }
        }
        Ok(())
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.page_refs()?.len())
    }

    /// Position of `page` in document order.
    pub fn page_index_of(&self, page: ObjectRef) -> Result<Option<usize>> {
        let page = if page.owner.is_detached() {
            page.with_owner(self.id)
        } else {
            page
        };
        Ok(self.page_refs()?.iter().position(|p| *p == page))
    }

    /// Inheritable attributes (`/Resources`, `/MediaBox`, `/CropBox`, `/Rotate`) the
    /// page does not set itself, taken from the nearest ancestor that does.
    ///
    /// PDF Spec: ISO 32000-1:2008, Section 7.7.3.4
    pub fn inherited_page_attributes(&self, page: ObjectRef) -> Result<Dict> {
        let page_obj = self.get_object(page)?;
        let mut inherited = Dict::new();
        let mut visited = HashSet::from([page]);
        let mut parent = page_obj.get("Parent").and_then(|p| p.as_reference());

        while let Some(node_ref) = parent {
            if !visited.insert(node_ref) || visited.len() as u32 > self.options.max_recursion_depth {
                self.options
                    .tolerate(format!("Loop in /Parent chain of page {}", page))?;
                break;
            }
            let node = self.get_object(node_ref)?;
            for key in INHERITABLE_PAGE_ATTRIBUTES {
                if page_obj.get(key).is_some() || inherited.contains_key(key) {
                    continue;
                }
                if let Some(value) = node.get(key) {
                    inherited.insert(key.to_string(), value.clone());
                }
            }
            parent = node.get("Parent").and_then(|p| p.as_reference());
        }
        Ok(inherited)
    }

    /// Number of distinct indirect objects reachable from `/Root`, `/Root` included.
    pub fn reachable_object_count(&self) -> Result<usize> {
        let Some(Object::Reference(root)) = self.trailer().get("Root") else {
            return Ok(0);
        };
        let mut seen = HashSet::from([*root]);
        let mut queue = vec![*root];

        while let Some(next) = queue.pop() {
            let obj = match self.get_object(next) {
                Ok(obj) => obj,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::debug!("Unreachable object {}: {}", next, e);
                    continue;
                },
            };
            let mut stack: Vec<&Object> = vec![obj.as_ref()];
            while let Some(value) = stack.pop() {
                match value {
                    Object::Reference(r) => {
                        if seen.insert(*r) {
                            queue.push(*r);
                        }
                    },
                    Object::Array(items) => stack.extend(items.iter()),
                    Object::Dictionary(dict) | Object::Stream { dict, .. } => stack.extend(dict.values()),
                    _ => {},
                }
            }
        }
        Ok(seen.len())
    }
}

impl ObjectResolver for PdfDocument {
    fn resolve_reference(&self, obj_ref: ObjectRef) -> Result<Rc<Object>> {
        self.get_object(obj_ref)
    }

    fn next_object_offset(&self, pos: usize) -> Option<usize> {
        self.xref.next_object_offset(pos)
    }
}

/// Read the version from the `%PDF-M.m` header.
///
/// Strict mode requires the header at byte 0. Permissive mode accepts leading
/// garbage within the first kilobyte and falls back to 1.4 without a header.
pub fn parse_header(data: &[u8], options: &ParserOptions) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = match window.windows(5).position(|w| w == b"%PDF-") {
        Some(0) => 0,
        Some(pos) => {
            options.tolerate(format!("PDF header found at byte {} instead of 0", pos))?;
            pos
        },
        None => {
            options.tolerate(format!(
                "PDF starts with '{}', but '%PDF-' expected",
                String::from_utf8_lossy(&data[..data.len().min(5)])
            ))?;
            return Ok((1, 4));
        },
    };

    let digits = &data[start + 5..data.len().min(start + 8)];
    match digits {
        [major @ b'0'..=b'9', b'.', minor @ b'0'..=b'9'] => Ok((major - b'0', minor - b'0')),
        _ => {
            options.tolerate(format!(
                "Invalid PDF version '{}'",
                String::from_utf8_lossy(digits)
            ))?;
            Ok((1, 4))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::PasswordStatus;

    /// Classic-table file from `(id, body)` pairs; `/Root` is the first object.
    fn build_pdf(objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (id, body) in objects {
            offsets.push((*id, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        }
        let size = objects.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", size).as_bytes());
        for id in 1..size {
            match offsets.iter().find(|(i, _)| *i == id) {
                Some((_, off)) => out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes()),
                None => out.extend_from_slice(b"0000000000 00001 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
                size, objects[0].0, trailer_extra, xref
            )
            .as_bytes(),
        );
        out
    }

    fn two_page_pdf() -> Vec<u8> {
        build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] /Rotate 90 >>"),
                (3, "<< /Type /Page /Parent 2 0 R >>"),
                (4, "<< /Type /Page /Parent 2 0 R /Rotate 0 >>"),
            ],
            "",
        )
    }

    #[test]
    fn test_parse_header() {
        let strict = ParserOptions::strict();
        assert_eq!(parse_header(b"%PDF-1.7\n", &strict).unwrap(), (1, 7));
        assert_eq!(parse_header(b"%PDF-2.0\n", &strict).unwrap(), (2, 0));
        assert!(parse_header(b"junk%PDF-1.4", &strict).is_err());
        assert_eq!(parse_header(b"junk%PDF-1.4", &ParserOptions::default()).unwrap(), (1, 4));
        assert!(parse_header(b"%PDF-x.y", &strict).is_err());
        assert!(parse_header(b"GIF89a", &strict).is_err());
    }

    #[test]
    fn test_open_nonexistent_file() {
        let result = PdfDocument::open("/nonexistent/path/to/file.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(PdfDocument::from_bytes(Vec::new()), Err(Error::ReadError(_))));
    }

    #[test]
    fn test_get_object_is_memoized() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        let a = doc.get_object(ObjectRef::new(3, 0)).unwrap();
        let b = doc.get_object(ObjectRef::owned(3, 0, doc.id())).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.get("Type"), Some(&Object::name("Page")));
    }

    #[test]
    fn test_parsed_references_carry_document_id() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        let catalog = doc.catalog().unwrap();
        let pages = catalog.get("Pages").and_then(|p| p.as_reference()).unwrap();
        assert_eq!(pages.owner, doc.id());
    }

    #[test]
    fn test_foreign_reference_rejected() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        let other = DocumentId::next();
        let result = doc.get_object(ObjectRef::owned(1, 0, other));
        assert!(matches!(result, Err(Error::InvalidObjectType { .. })));
    }

    #[test]
    fn test_page_tree() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        assert_eq!(doc.page_count().unwrap(), 2);
        let pages = doc.page_refs().unwrap();
        assert_eq!(pages[1].id, 4);
        assert_eq!(doc.page_index_of(ObjectRef::new(4, 0)).unwrap(), Some(1));
        assert_eq!(doc.page_index_of(ObjectRef::new(2, 0)).unwrap(), None);
    }

    #[test]
    fn test_inherited_page_attributes() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        let first = doc.inherited_page_attributes(ObjectRef::new(3, 0)).unwrap();
        assert_eq!(first.get("Rotate"), Some(&Object::Integer(90)));
        assert!(first.contains_key("MediaBox"));

        // The page's own /Rotate wins
        let second = doc.inherited_page_attributes(ObjectRef::new(4, 0)).unwrap();
        assert!(!second.contains_key("Rotate"));
    }

    #[test]
    fn test_page_tree_cycle() {
        let data = build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R 2 0 R] /Count 1 >>"),
                (3, "<< /Type /Page /Parent 2 0 R >>"),
            ],
            "",
        );
        let doc = PdfDocument::from_bytes(data.clone()).unwrap();
        assert_eq!(doc.page_count().unwrap(), 1);

        let strict = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        assert!(matches!(strict.page_count(), Err(Error::ReadError(_))));
    }

    #[test]
    fn test_free_and_missing_objects() {
        let data = build_pdf(&[(1, "<< /Type /Catalog >>"), (3, "42")], "");
        let doc = PdfDocument::from_bytes(data.clone()).unwrap();
        assert!(doc.get_object(ObjectRef::new(2, 1)).unwrap().is_null());
        assert!(doc.get_object(ObjectRef::new(9, 0)).unwrap().is_null());

        let strict = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        assert!(matches!(strict.get_object(ObjectRef::new(9, 0)), Err(Error::ReadError(_))));
    }

    #[test]
    fn test_object_missing_from_table_found_by_scan() {
        let mut data = build_pdf(&[(1, "<< /Type /Catalog >>")], "");
        // An object the table does not know about, appended after %%EOF
        data.extend_from_slice(b"5 0 obj\n(stray)\nendobj\n");
        let doc = PdfDocument::from_bytes(data).unwrap();
        assert_eq!(*doc.get_object(ObjectRef::new(5, 0)).unwrap(), Object::String(b"stray".to_vec()));
    }

    #[test]
    fn test_bad_offset_repaired() {
        let mut data = build_pdf(&[(1, "<< /Type /Catalog >>"), (2, "(two)")], "");
        let text = String::from_utf8_lossy(&data).into_owned();
        let real = text.find("2 0 obj").unwrap();
        let wrong = format!("{:010} 00000 n", real + 3);
        let right = format!("{:010} 00000 n", real);
        data = text.replacen(&right, &wrong, 1).into_bytes();

        let doc = PdfDocument::from_bytes(data.clone()).unwrap();
        assert_eq!(*doc.get_object(ObjectRef::new(2, 0)).unwrap(), Object::String(b"two".to_vec()));

        let strict = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        assert!(strict.get_object(ObjectRef::new(2, 0)).is_err());
    }

    #[test]
    fn test_id_mismatch() {
        let mut data = build_pdf(&[(1, "<< /Type /Catalog >>"), (2, "(two)"), (3, "(three)")], "");
        let text = String::from_utf8_lossy(&data).into_owned();
        let two = format!("{:010} 00000 n", text.find("2 0 obj").unwrap());
        let three = format!("{:010} 00000 n", text.find("3 0 obj").unwrap());
        // Entry for 2 points at object 3
        data = text.replacen(&two, &three, 1).into_bytes();

        let doc = PdfDocument::from_bytes(data.clone()).unwrap();
        assert_eq!(*doc.get_object(ObjectRef::new(2, 0)).unwrap(), Object::String(b"two".to_vec()));
        assert_eq!(*doc.get_object(ObjectRef::new(3, 0)).unwrap(), Object::String(b"three".to_vec()));

        let strict = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        assert!(matches!(strict.get_object(ObjectRef::new(2, 0)), Err(Error::ReadError(_))));
    }

    #[test]
    fn test_id_mismatch_without_matching_header_keeps_value() {
        let data = build_pdf(&[(1, "<< /Type /Catalog >>"), (2, "(two)")], "");
        let text = String::from_utf8_lossy(&data).into_owned();
        // Header renumbered, so nothing in the file claims to be object 2
        let data = text.replacen("\n2 0 obj", "\n9 0 obj", 1).into_bytes();

        let doc = PdfDocument::from_bytes(data).unwrap();
        assert_eq!(*doc.get_object(ObjectRef::new(2, 0)).unwrap(), Object::String(b"two".to_vec()));
    }

    #[test]
    fn test_indirect_length_resolved_through_store() {
        let data = build_pdf(
            &[
                (1, "<< /Type /Catalog >>"),
                (2, "<< /Length 3 0 R >>\nstream\nhello\nendstream"),
                (3, "5"),
            ],
            "",
        );
        let doc = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        let stream = doc.get_object(ObjectRef::new(2, 0)).unwrap();
        assert_eq!(&stream.get_data().unwrap()[..], b"hello");
        // The length object was loaded and cached on the way
        assert!(Rc::ptr_eq(
            &doc.get_object(ObjectRef::new(3, 0)).unwrap(),
            &doc.get_object(ObjectRef::new(3, 0)).unwrap()
        ));
    }

    #[test]
    fn test_self_referencing_length_is_circular() {
        let data = build_pdf(
            &[(1, "<< /Type /Catalog >>"), (2, "<< /Length 2 0 R >>\nstream\nhello\nendstream")],
            "",
        );
        let doc = PdfDocument::from_bytes_with_options(data, ParserOptions::strict()).unwrap();
        assert!(matches!(
            doc.get_object(ObjectRef::new(2, 0)),
            Err(Error::CircularReference(_))
        ));
    }

    #[test]
    fn test_recursion_limit() {
        // Each stream's /Length points at the next stream
        let mut objects: Vec<(u32, String)> = vec![(1, "<< /Type /Catalog >>".to_string())];
        for id in 2..8 {
            objects.push((id, format!("<< /Length {} 0 R >>\nstream\nx\nendstream", id + 1)));
        }
        objects.push((8, "1".to_string()));
        let borrowed: Vec<(u32, &str)> = objects.iter().map(|(i, s)| (*i, s.as_str())).collect();
        let options = ParserOptions {
            max_recursion_depth: 3,
            ..ParserOptions::strict()
        };
        let doc = PdfDocument::from_bytes_with_options(build_pdf(&borrowed, ""), options).unwrap();
        assert!(matches!(
            doc.get_object(ObjectRef::new(2, 0)),
            Err(Error::RecursionLimitExceeded(3))
        ));
        // Guards are unwound after the failure
        assert!(doc.get_object(ObjectRef::new(7, 0)).is_ok());
    }

    #[test]
    fn test_cache_object_overwrite_rule() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        let r = ObjectRef::new(3, 0);
        let original = doc.get_object(r).unwrap();
        let same = doc.cache_object(r, original.as_ref().clone()).unwrap();
        assert!(Rc::ptr_eq(&original, &same));

        let replaced = doc.cache_object(r, Object::Integer(1)).unwrap();
        assert!(Rc::ptr_eq(&replaced, &doc.get_object(r).unwrap()));

        let strict = PdfDocument::from_bytes_with_options(two_page_pdf(), ParserOptions::strict()).unwrap();
        strict.get_object(r).unwrap();
        assert!(matches!(strict.cache_object(r, Object::Integer(1)), Err(Error::ReadError(_))));
    }

    #[test]
    fn test_reachable_object_count() {
        let doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        assert_eq!(doc.reachable_object_count().unwrap(), 4);
    }

    #[test]
    fn test_resolve_chain() {
        let data = build_pdf(&[(1, "<< /Type /Catalog >>"), (2, "3 0 R"), (3, "/Leaf")], "");
        let doc = PdfDocument::from_bytes(data).unwrap();
        let resolved = doc.resolve(&Object::Reference(ObjectRef::new(2, 0))).unwrap();
        assert_eq!(resolved, Object::name("Leaf"));
        assert_eq!(doc.resolve(&Object::Integer(4)).unwrap(), Object::Integer(4));
    }

    /// Reverses string bytes; "open" unlocks it.
    struct ReverseHandler {
        unlocked: bool,
    }

    impl SecurityHandler for ReverseHandler {
        fn authenticate(&mut self, password: &[u8]) -> Result<PasswordStatus> {
            self.unlocked = password == b"open";
            Ok(if self.unlocked {
                PasswordStatus::Owner
            } else {
                PasswordStatus::NotDecrypted
            })
        }

        fn is_authenticated(&self) -> bool {
            self.unlocked
        }

        fn decrypt_bytes(&self, data: &[u8], _id: u32, _gen: u16) -> Result<Vec<u8>> {
            Ok(data.iter().rev().copied().collect())
        }
    }

    #[test]
    fn test_encrypted_document() {
        let data = build_pdf(
            &[
                (1, "<< /Type /Catalog /Title (olleh) >>"),
                (2, "<< /Filter /Standard /V 1 /O (owner) >>"),
            ],
            " /Encrypt 2 0 R",
        );
        let mut doc = PdfDocument::from_bytes(data).unwrap();
        assert!(doc.is_encrypted());

        // The /Encrypt dictionary is readable without a key
        let encrypt = doc.encrypt_dict().unwrap().unwrap();
        assert_eq!(encrypt.filter, "Standard");

        assert!(matches!(doc.catalog(), Err(Error::ReadError(_))));
        assert!(matches!(doc.decrypt(b"open"), Err(Error::ReadError(_))));

        doc.set_security_handler(Box::new(ReverseHandler { unlocked: false }));
        assert!(matches!(doc.decrypt(b"wrong"), Err(Error::ReadError(_))));
        assert_eq!(doc.decrypt(b"open").unwrap(), PasswordStatus::Owner);

        let catalog = doc.catalog().unwrap();
        assert_eq!(catalog.get("Title"), Some(&Object::String(b"hello".to_vec())));
        // The encryption dictionary itself is left alone
        let raw = doc.get_object(ObjectRef::new(2, 0)).unwrap();
        assert_eq!(raw.get("O"), Some(&Object::String(b"owner".to_vec())));
    }

    #[test]
    fn test_decrypt_unencrypted() {
        let mut doc = PdfDocument::from_bytes(two_page_pdf()).unwrap();
        assert!(!doc.is_encrypted());
        assert!(doc.decrypt(b"").is_err());
    }
}
