//! PDF document writer.
//!
//! The writer owns an output object table. Values placed in it may still refer to
//! objects of open source documents; [`PdfWriter::sweep`] copies everything such a
//! value reaches into the table and rewrites the references, so the written file
//! is self-contained.
//!
//! Output numbering is deterministic: the sweep is depth-first over an explicit
//! work stack and visits dictionary keys in sorted order.

use super::object_serializer::ObjectSerializer;
use crate::decoders::filter_for;
use crate::document::PdfDocument;
use crate::encryption::EncryptionContext;
use crate::error::{Error, Result};
use crate::object::{Dict, DocumentId, Object, ObjectRef};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// PDF version written in the header (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Producer application
    pub producer: Option<String>,
    /// Compress streams that have no filter with FlateDecode
    pub compress: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            producer: Some("pdf_objgraph".to_string()),
            compress: false,
        }
    }
}

impl WriterConfig {
    /// Set the header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the producer; `None` omits it.
    pub fn with_producer(mut self, producer: Option<String>) -> Self {
        self.producer = producer;
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, streams written without a `/Filter` are compressed with
    /// FlateDecode.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Pending work for the sweep.
#[derive(Debug)]
enum Task {
    /// Rewrite the references inside an output slot
    Sweep(u32),
    /// Fill a reserved slot with a copy of a source object
    Clone { slot: u32, from: ObjectRef },
}

/// PDF document writer.
///
/// Object `n` of the output lives in slot `n - 1`; object 1 is the page tree root,
/// 2 the catalog and 3 the document information dictionary.
pub struct PdfWriter {
    config: WriterConfig,
    id: DocumentId,
    objects: Vec<Object>,
    pages_ref: ObjectRef,
    root_ref: ObjectRef,
    info_ref: ObjectRef,
    /// Output pages in order
    page_list: Vec<ObjectRef>,
    /// Documents that references in the table may point into
    sources: HashMap<DocumentId, Rc<PdfDocument>>,
    /// Source reference -> output reference
    translated: HashMap<ObjectRef, ObjectRef>,
    /// Slots allocated for a copy that has not been filled yet
    reserved: HashSet<u32>,
    encryption: Option<(Box<dyn EncryptionContext>, ObjectRef)>,
    file_id: Option<(Vec<u8>, Vec<u8>)>,
}

impl std::fmt::Debug for PdfWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfWriter")
            .field("id", &self.id)
            .field("objects", &self.objects.len())
            .field("pages", &self.page_list.len())
            .field("sources", &self.sources.len())
            .field("encrypted", &self.encryption.is_some())
            .finish_non_exhaustive()
    }
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: WriterConfig) -> Self {
        let id = DocumentId::next();
        let pages_ref = ObjectRef::owned(1, 0, id);
        let root_ref = ObjectRef::owned(2, 0, id);
        let info_ref = ObjectRef::owned(3, 0, id);

        let mut pages = Dict::new();
        pages.insert("Type".to_string(), Object::name("Pages"));
        pages.insert("Kids".to_string(), Object::Array(Vec::new()));
        pages.insert("Count".to_string(), Object::Integer(0));

        let mut catalog = Dict::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        catalog.insert("Pages".to_string(), Object::Reference(pages_ref));

        let mut info = Dict::new();
        for (key, value) in [
            ("Title", &config.title),
            ("Author", &config.author),
            ("Producer", &config.producer),
        ] {
            if let Some(value) = value {
                info.insert(key.to_string(), Object::text(value));
            }
        }

        Self {
            config,
            id,
            objects: vec![
                Object::Dictionary(pages),
                Object::Dictionary(catalog),
                Object::Dictionary(info),
            ],
            pages_ref,
            root_ref,
            info_ref,
            page_list: Vec::new(),
            sources: HashMap::new(),
            translated: HashMap::new(),
            reserved: HashSet::new(),
            encryption: None,
            file_id: None,
        }
    }

    /// Identity stamped on references into the output table.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The catalog.
    pub fn root_ref(&self) -> ObjectRef {
        self.root_ref
    }

    /// The page tree root.
    pub fn pages_ref(&self) -> ObjectRef {
        self.pages_ref
    }

    /// The document information dictionary.
    pub fn info_ref(&self) -> ObjectRef {
        self.info_ref
    }

    /// Number of objects in the output table, placeholders included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn is_own(&self, r: ObjectRef) -> bool {
        r.owner == self.id || r.owner.is_detached()
    }

    fn slot_index(&self, r: ObjectRef) -> Result<usize> {
        if !self.is_own(r) {
            return Err(Error::InvalidObjectType {
                expected: "reference into the output table".to_string(),
                found: format!("{} from document {:?}", r, r.owner),
            });
        }
        match r.id as usize {
            0 => Err(Error::ObjectNotFound(r.id, r.gen)),
            n if n > self.objects.len() => Err(Error::ObjectNotFound(r.id, r.gen)),
            n => Ok(n - 1),
        }
    }

    /// Append `obj` to the output table.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        self.objects.push(obj);
        ObjectRef::owned(self.objects.len() as u32, 0, self.id)
    }

    /// Output object `r`.
    pub fn get_object(&self, r: ObjectRef) -> Result<&Object> {
        let index = self.slot_index(r)?;
        Ok(&self.objects[index])
    }

    /// Output object `r`, mutably.
    pub fn get_object_mut(&mut self, r: ObjectRef) -> Result<&mut Object> {
        let index = self.slot_index(r)?;
        Ok(&mut self.objects[index])
    }

    /// Reference of the table slot holding exactly this value (by address).
    pub fn get_reference(&self, obj: &Object) -> Option<ObjectRef> {
        self.objects
            .iter()
            .position(|slot| std::ptr::eq(slot, obj))
            .map(|index| ObjectRef::owned(index as u32 + 1, 0, self.id))
    }

    /// Output reference a source reference was translated to, if any.
    pub fn translation(&self, source_ref: ObjectRef) -> Option<ObjectRef> {
        self.translated.get(&source_ref).copied()
    }

    /// Make `source` available to the sweep.
    pub fn add_source(&mut self, source: &Rc<PdfDocument>) {
        self.sources
            .entry(source.id())
            .or_insert_with(|| Rc::clone(source));
    }

    /// Output pages in order.
    pub fn page_refs(&self) -> &[ObjectRef] {
        &self.page_list
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.page_list.len()
    }

    /// Append a page dictionary.
    pub fn add_page(&mut self, page: Object) -> Result<ObjectRef> {
        let index = self.page_list.len();
        self.insert_page(page, index)
    }

    /// Insert a page dictionary at `index` (clamped to the page count).
    ///
    /// # Errors
    ///
    /// `InvalidObjectType` unless `page` is a dictionary with `/Type /Page`.
    pub fn insert_page(&mut self, page: Object, index: usize) -> Result<ObjectRef> {
        let mut dict = match page {
            Object::Dictionary(dict) if dict.get("Type").and_then(|t| t.as_name()) == Some("Page") => dict,
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Page dictionary".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };
        dict.insert("Parent".to_string(), Object::Reference(self.pages_ref));
        let page_ref = self.add_object(Object::Dictionary(dict));
        self.page_list.insert(index.min(self.page_list.len()), page_ref);
        self.sync_page_tree()?;
        Ok(page_ref)
    }

    /// Append a copy of page `page` of `source`.
    pub fn add_page_from(&mut self, source: &Rc<PdfDocument>, page: ObjectRef) -> Result<ObjectRef> {
        let index = self.page_list.len();
        self.insert_page_from(source, page, index)
    }

    /// Insert a copy of page `page` of `source` at `index`.
    ///
    /// The page dictionary is copied shallowly: `/Parent` is dropped, inherited
    /// attributes are written onto the copy, and everything else still points into
    /// `source` until the next sweep. The source page is registered as translated
    /// to the copy, so references to it elsewhere land on the copy.
    pub fn insert_page_from(&mut self, source: &Rc<PdfDocument>, page: ObjectRef, index: usize) -> Result<ObjectRef> {
        let page = if page.owner.is_detached() {
            page.with_owner(source.id())
        } else {
            page
        };
        if page.owner != source.id() {
            return Err(Error::InvalidObjectType {
                expected: format!("page of document {:?}", source.id()),
                found: format!("{} from document {:?}", page, page.owner),
            });
        }
        self.add_source(source);

        let page_obj = source.get_object(page)?;
        let mut dict = page_obj
            .as_dict()
            .cloned()
            .ok_or_else(|| Error::InvalidObjectType {
                expected: "Page dictionary".to_string(),
                found: page_obj.type_name().to_string(),
            })?;
        dict.remove("Parent");
        for (key, value) in source.inherited_page_attributes(page)? {
            dict.entry(key).or_insert(value);
        }
        dict.insert("Parent".to_string(), Object::Reference(self.pages_ref));

        let copy = self.add_object(Object::Dictionary(dict));
        self.translated.entry(page).or_insert(copy);
        self.page_list.insert(index.min(self.page_list.len()), copy);
        self.sync_page_tree()?;

        log::debug!("Copied page {} of {:?} to {}", page, source.id(), copy);
        Ok(copy)
    }

    fn sync_page_tree(&mut self) -> Result<()> {
        let kids: Vec<Object> = self.page_list.iter().map(|r| Object::Reference(*r)).collect();
        let count = kids.len() as i64;
        let pages = self.pages_ref;
        let dict = self
            .get_object_mut(pages)?
            .as_dict_mut()
            .ok_or_else(|| Error::InvalidObjectType {
                expected: "Pages dictionary".to_string(),
                found: "replaced page tree root".to_string(),
            })?;
        dict.insert("Kids".to_string(), Object::Array(kids));
        dict.insert("Count".to_string(), Object::Integer(count));
        Ok(())
    }

    /// Set an entry of the document information dictionary.
    pub fn set_info_entry(&mut self, key: impl Into<String>, value: Object) -> Result<()> {
        let info = self.info_ref;
        match self.get_object_mut(info)?.as_dict_mut() {
            Some(dict) => {
                dict.insert(key.into(), value);
                Ok(())
            },
            None => Err(Error::InvalidObjectType {
                expected: "Info dictionary".to_string(),
                found: "replaced information dictionary".to_string(),
            }),
        }
    }

    /// Encrypt the output with `context`. `encrypt_dict` is the output object holding
    /// the `/Encrypt` dictionary; it is written unencrypted.
    pub fn set_encryption(&mut self, context: Box<dyn EncryptionContext>, encrypt_dict: ObjectRef) -> Result<()> {
        let index = self.slot_index(encrypt_dict)?;
        if self.objects[index].as_dict().is_none() {
            return Err(Error::InvalidObjectType {
                expected: "Encrypt dictionary".to_string(),
                found: self.objects[index].type_name().to_string(),
            });
        }
        self.encryption = Some((context, encrypt_dict.with_owner(self.id)));
        Ok(())
    }

    /// Set the trailer `/ID` pair.
    pub fn set_file_id(&mut self, permanent: Vec<u8>, changing: Vec<u8>) {
        self.file_id = Some((permanent, changing));
    }

    /// Make everything reachable from `root` self-contained.
    ///
    /// References into source documents are replaced by references to copies in
    /// the output table; each source object is copied at most once per writer, and
    /// cycles are followed only once. Inline streams are moved into their own slots.
    /// Source objects that cannot be read leave a null slot and a warning.
    ///
    /// Returns the output reference of `root`.
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` / `InvalidObjectType` if `root` is not a valid reference
    /// - `DuplicateObject` if a reserved slot is filled twice
    pub fn sweep(&mut self, root: ObjectRef) -> Result<ObjectRef> {
        let mut tasks = Vec::new();
        let mut visited = HashSet::new();

        let root = if self.is_own(root) {
            self.slot_index(root)?;
            let root = root.with_owner(self.id);
            visited.insert(root.id);
            tasks.push(Task::Sweep(root.id));
            root
        } else {
            self.translate(root, &mut tasks)
        };

        while let Some(task) = tasks.pop() {
            match task {
                Task::Sweep(id) => self.sweep_slot(id, &mut visited, &mut tasks),
                Task::Clone { slot, from } => {
                    self.fill_slot(slot, from)?;
                    if visited.insert(slot) {
                        tasks.push(Task::Sweep(slot));
                    }
                },
            }
        }

        log::debug!("Swept {}: {} objects in output table", root, self.objects.len());
        Ok(root)
    }

    fn sweep_slot(&mut self, id: u32, visited: &mut HashSet<u32>, tasks: &mut Vec<Task>) {
        let index = id as usize - 1;
        let mut value = std::mem::replace(&mut self.objects[index], Object::Null);
        self.sweep_value(&mut value, visited, tasks);
        self.objects[index] = value;
    }

    fn sweep_value(&mut self, value: &mut Object, visited: &mut HashSet<u32>, tasks: &mut Vec<Task>) {
        match value {
            Object::Reference(r) => *r = self.sweep_reference(*r, visited, tasks),
            Object::Array(items) => {
                for item in items.iter_mut() {
                    self.sweep_child(item, visited, tasks);
                }
            },
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                let mut keys: Vec<String> = dict.keys().cloned().collect();
                keys.sort();
                for key in keys {
                    if let Some(child) = dict.get_mut(&key) {
                        self.sweep_child(child, visited, tasks);
                    }
                }
            },
            _ => {},
        }
    }

    /// Sweep a value nested in a container; streams are lifted into their own slot.
    fn sweep_child(&mut self, child: &mut Object, visited: &mut HashSet<u32>, tasks: &mut Vec<Task>) {
        if matches!(child, Object::Stream { .. }) {
            let stream = std::mem::replace(child, Object::Null);
            let lifted = self.add_object(stream);
            visited.insert(lifted.id);
            tasks.push(Task::Sweep(lifted.id));
            *child = Object::Reference(lifted);
            return;
        }
        self.sweep_value(child, visited, tasks);
    }

    fn sweep_reference(&mut self, r: ObjectRef, visited: &mut HashSet<u32>, tasks: &mut Vec<Task>) -> ObjectRef {
        if !self.is_own(r) {
            return self.translate(r, tasks);
        }
        let r = r.with_owner(self.id);
        if r.id == 0 || r.id as usize > self.objects.len() {
            log::warn!("Dangling reference {} in output table", r);
        } else if visited.insert(r.id) {
            tasks.push(Task::Sweep(r.id));
        }
        r
    }

    /// Output reference for source reference `r`, reserving a slot on first sight.
    fn translate(&mut self, r: ObjectRef, tasks: &mut Vec<Task>) -> ObjectRef {
        if let Some(out) = self.translated.get(&r) {
            return *out;
        }
        let out = self.add_object(Object::Null);
        self.reserved.insert(out.id);
        self.translated.insert(r, out);
        tasks.push(Task::Clone { slot: out.id, from: r });
        log::trace!("Reserved {} for {} of {:?}", out, r, r.owner);
        out
    }

    fn fill_slot(&mut self, slot: u32, from: ObjectRef) -> Result<()> {
        if !self.reserved.remove(&slot) {
            return Err(Error::DuplicateObject(slot));
        }
        let Some(source) = self.sources.get(&from.owner).cloned() else {
            log::warn!("No source document {:?} for {}; writing null", from.owner, from);
            return Ok(());
        };
        let mut value = match source.get_object(from) {
            Ok(value) => value.as_ref().clone(),
            Err(e) => {
                log::warn!("Cannot copy {} from {:?}: {}; writing null", from, from.owner, e);
                return Ok(());
            },
        };

        match &mut value {
            Object::Stream { dict, data, .. } => {
                dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
            },
            // Pages that were not copied explicitly must not drag their tree along
            Object::Dictionary(dict) if dict.get("Type").and_then(|t| t.as_name()) == Some("Page") => {
                dict.remove("Parent");
            },
            _ => {},
        }
        self.objects[slot as usize - 1] = value;
        Ok(())
    }

    /// Stamp the info dictionary with creation and modification dates.
    fn stamp_dates(&mut self) -> Result<()> {
        let now = Object::String(chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string().into_bytes());
        let info = self.info_ref;
        if let Some(dict) = self.get_object_mut(info)?.as_dict_mut() {
            dict.entry("CreationDate".to_string()).or_insert_with(|| now.clone());
            dict.insert("ModDate".to_string(), now);
        }
        Ok(())
    }

    /// Compress and encrypt one object for output.
    fn prepare_output<'a>(&self, id: u32, obj: &'a Object) -> Result<Cow<'a, Object>> {
        let mut out = Cow::Borrowed(obj);

        if self.config.compress {
            if let Object::Stream { dict, data, .. } = obj {
                if !dict.contains_key("Filter") {
                    let flate = filter_for("FlateDecode")
                        .ok_or_else(|| Error::UnsupportedFilter("FlateDecode".to_string()))?;
                    let mut dict = dict.clone();
                    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                    out = Cow::Owned(Object::stream(dict, flate.encode(data)?));
                }
            }
        }

        if let Some((context, encrypt_ref)) = &self.encryption {
            if encrypt_ref.id != id {
                out = Cow::Owned(context.encrypt_object(&out, id, 0)?);
            }
        }
        Ok(out)
    }

    /// Sweep the catalog and info dictionary, then serialize the document.
    ///
    /// Null slots are written as free entries of the cross-reference table.
    pub fn write<W: Write>(&mut self, mut w: W) -> Result<()> {
        self.sync_page_tree()?;
        self.stamp_dates()?;
        let root = self.sweep(self.root_ref)?;
        let info = self.sweep(self.info_ref)?;
        let encrypt = match self.encryption.as_ref().map(|(_, r)| *r) {
            Some(r) => Some(self.sweep(r)?),
            None => None,
        };
        if !self.reserved.is_empty() {
            log::warn!("{} reserved slots were never filled", self.reserved.len());
        }

        let serializer = ObjectSerializer::compact();
        let mut output = format!("%PDF-{}\n", self.config.version).into_bytes();
        // Binary marker (recommended for binary content)
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (index, obj) in self.objects.iter().enumerate() {
            let id = index as u32 + 1;
            if obj.is_null() {
                offsets.push(None);
                continue;
            }
            offsets.push(Some(output.len()));
            let prepared = self.prepare_output(id, obj)?;
            output.extend_from_slice(&serializer.serialize_indirect(id, 0, &prepared));
        }

        let xref_start = output.len();
        output.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            match offset {
                Some(offset) => output.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
                None => output.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        let mut trailer = Dict::new();
        trailer.insert("Size".to_string(), Object::Integer(self.objects.len() as i64 + 1));
        trailer.insert("Root".to_string(), Object::Reference(root));
        trailer.insert("Info".to_string(), Object::Reference(info));
        if let Some(encrypt) = encrypt {
            trailer.insert("Encrypt".to_string(), Object::Reference(encrypt));
        }
        if let Some((permanent, changing)) = &self.file_id {
            trailer.insert(
                "ID".to_string(),
                Object::Array(vec![Object::String(permanent.clone()), Object::String(changing.clone())]),
            );
        }

        output.extend_from_slice(b"trailer\n");
        output.extend_from_slice(&serializer.serialize(&Object::Dictionary(trailer)));
        output.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_start).as_bytes());

        w.write_all(&output)?;
        w.flush()?;
        log::debug!("Wrote {} objects, {} bytes", self.objects.len(), output.len());
        Ok(())
    }

    /// Write the PDF to a file.
    pub fn write_to_path(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file))
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_config::ParserOptions;

    fn build_pdf(objects: &[(u32, &str)]) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (id, body) in objects {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for off in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        out
    }

    /// Two pages sharing a font; page 3 has an annotation pointing back at it.
    fn source() -> Rc<PdfDocument> {
        let data = build_pdf(&[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] >>"),
            (3, "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 5 0 R >> >> /Annots [6 0 R] >>"),
            (4, "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 5 0 R >> >> >>"),
            (5, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
            (6, "<< /Type /Annot /Subtype /Link /P 3 0 R /Dest [4 0 R /Fit] >>"),
        ]);
        Rc::new(PdfDocument::from_bytes(data).unwrap())
    }

    fn write_and_reopen(writer: &mut PdfWriter) -> PdfDocument {
        let mut out = Vec::new();
        writer.write(&mut out).unwrap();
        PdfDocument::from_bytes_with_options(out, ParserOptions::strict()).unwrap()
    }

    fn blank_page() -> Object {
        let mut page = Dict::new();
        page.insert("Type".to_string(), Object::name("Page"));
        page.insert(
            "MediaBox".to_string(),
            Object::Array(vec![0, 0, 612, 792].into_iter().map(Object::Integer).collect()),
        );
        Object::Dictionary(page)
    }

    #[test]
    fn test_empty_document() {
        let mut writer = PdfWriter::new();
        let doc = write_and_reopen(&mut writer);
        assert_eq!(doc.page_count().unwrap(), 0);
        let info = doc.resolve(&doc.trailer()["Info"]).unwrap();
        assert_eq!(info.get("Producer").and_then(|p| p.as_text()).as_deref(), Some("pdf_objgraph"));
        assert!(info.get("ModDate").is_some());
    }

    #[test]
    fn test_add_page() {
        let mut writer = PdfWriter::with_config(WriterConfig::default().with_title("Blank"));
        writer.add_page(blank_page()).unwrap();
        writer.insert_page(blank_page(), 0).unwrap();
        assert_eq!(writer.page_count(), 2);
        assert!(writer.add_page(Object::Integer(1)).is_err());

        let doc = write_and_reopen(&mut writer);
        assert_eq!(doc.page_count().unwrap(), 2);
    }

    #[test]
    fn test_get_reference_by_identity() {
        let mut writer = PdfWriter::new();
        let r = writer.add_object(Object::Integer(7));
        let twin = Object::Integer(7);
        assert_eq!(writer.get_reference(writer.get_object(r).unwrap()), Some(r));
        assert_eq!(writer.get_reference(&twin), None);
    }

    #[test]
    fn test_get_object_foreign_ref() {
        let writer = PdfWriter::new();
        let foreign = ObjectRef::owned(1, 0, DocumentId::next());
        assert!(matches!(writer.get_object(foreign), Err(Error::InvalidObjectType { .. })));
        assert!(matches!(writer.get_object(ObjectRef::new(99, 0)), Err(Error::ObjectNotFound(99, 0))));
    }

    #[test]
    fn test_sweep_lifts_inline_streams() {
        let mut writer = PdfWriter::new();
        let mut page = blank_page();
        page.as_dict_mut()
            .unwrap()
            .insert("Contents".to_string(), Object::stream(Dict::new(), b"0 0 m".to_vec()));
        let page_ref = writer.add_page(page).unwrap();
        writer.sweep(writer.root_ref()).unwrap();

        let contents = writer.get_object(page_ref).unwrap().get("Contents").unwrap();
        let lifted = contents.as_reference().expect("stream lifted into its own slot");
        assert!(matches!(writer.get_object(lifted).unwrap(), Object::Stream { .. }));
    }

    #[test]
    fn test_own_cycle() {
        let mut writer = PdfWriter::new();
        let a = writer.add_object(Object::Null);
        let b = writer.add_object(Object::Array(vec![Object::Reference(a)]));
        *writer.get_object_mut(a).unwrap() = Object::Array(vec![Object::Reference(b)]);
        let before = writer.object_count();
        assert_eq!(writer.sweep(a).unwrap(), a);
        assert_eq!(writer.object_count(), before);
    }

    #[test]
    fn test_copy_pages_from_source() {
        let src = source();
        let pages = src.page_refs().unwrap();
        let mut writer = PdfWriter::new();
        let first = writer.add_page_from(&src, pages[0]).unwrap();
        let second = writer.add_page_from(&src, pages[1]).unwrap();
        writer.sweep(writer.root_ref()).unwrap();

        // Inherited /MediaBox was materialized on the copy
        assert!(writer.get_object(first).unwrap().get("MediaBox").is_some());

        // Shared font copied once
        let font_of = |page: ObjectRef| {
            writer.get_object(page).unwrap().get("Resources").unwrap().get("Font").unwrap().get("F1").unwrap().as_reference().unwrap()
        };
        assert_eq!(font_of(first), font_of(second));
        assert_eq!(font_of(first).owner, writer.id());

        // Annotation back-references land on the copies
        let annot_ref = writer.get_object(first).unwrap().get("Annots").unwrap().as_array().unwrap()[0]
            .as_reference()
            .unwrap();
        let annot = writer.get_object(annot_ref).unwrap();
        assert_eq!(annot.get("P"), Some(&Object::Reference(first)));
        assert_eq!(annot.get("Dest").unwrap().as_array().unwrap()[0], Object::Reference(second));

        let doc = write_and_reopen(&mut writer);
        assert_eq!(doc.page_count().unwrap(), 2);
    }

    #[test]
    fn test_foreign_cycle_cloned_once() {
        let data = build_pdf(&[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, "<< /Type /Page /Parent 2 0 R /A 4 0 R >>"),
            (4, "<< /Next 5 0 R >>"),
            (5, "<< /Next 4 0 R >>"),
        ]);
        let src = Rc::new(PdfDocument::from_bytes(data).unwrap());
        let mut writer = PdfWriter::new();
        let page = writer.add_page_from(&src, ObjectRef::new(3, 0)).unwrap();
        let before = writer.object_count();
        writer.sweep(writer.root_ref()).unwrap();
        assert_eq!(writer.object_count(), before + 2);

        let a = writer.get_object(page).unwrap().get("A").unwrap().as_reference().unwrap();
        let b = writer.get_object(a).unwrap().get("Next").unwrap().as_reference().unwrap();
        assert_eq!(writer.get_object(b).unwrap().get("Next"), Some(&Object::Reference(a)));
    }

    #[test]
    fn test_unknown_source_becomes_null() {
        let mut writer = PdfWriter::new();
        let stranger = ObjectRef::owned(4, 0, DocumentId::next());
        let holder = writer.add_object(Object::Array(vec![Object::Reference(stranger)]));
        writer.sweep(holder).unwrap();
        let slot = writer.get_object(holder).unwrap().as_array().unwrap()[0].as_reference().unwrap();
        assert!(writer.get_object(slot).unwrap().is_null());
    }

    #[test]
    fn test_filling_a_slot_twice() {
        let src = source();
        let mut writer = PdfWriter::new();
        writer.add_source(&src);
        let mut tasks = Vec::new();
        let from = ObjectRef::owned(5, 0, src.id());
        let slot = writer.translate(from, &mut tasks);
        writer.fill_slot(slot.id, from).unwrap();
        assert!(matches!(writer.fill_slot(slot.id, from), Err(Error::DuplicateObject(id)) if id == slot.id));
    }

    #[test]
    fn test_compress_new_streams() {
        let mut writer = PdfWriter::with_config(WriterConfig::default().with_compress(true));
        let stream = writer.add_object(Object::stream(Dict::new(), b"BT /F1 12 Tf ET".repeat(10)));
        let mut page = blank_page();
        page.as_dict_mut().unwrap().insert("Contents".to_string(), Object::Reference(stream));
        writer.add_page(page).unwrap();

        let doc = write_and_reopen(&mut writer);
        let page = doc.get_object(doc.page_refs().unwrap()[0]).unwrap();
        let contents = doc.resolve(page.get("Contents").unwrap()).unwrap();
        assert_eq!(contents.get("Filter"), Some(&Object::name("FlateDecode")));
        assert_eq!(&contents.get_data().unwrap()[..], &b"BT /F1 12 Tf ET".repeat(10)[..]);
    }

    struct Rot13;

    impl EncryptionContext for Rot13 {
        fn encrypt_bytes(&self, data: &[u8], _id: u32, _gen: u16) -> Result<Vec<u8>> {
            Ok(data
                .iter()
                .map(|b| match b {
                    b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
                    _ => *b,
                })
                .collect())
        }
    }

    #[test]
    fn test_encrypted_output() {
        let mut writer = PdfWriter::with_config(WriterConfig::default().with_producer(None));
        writer.set_info_entry("Title", Object::String(b"hello".to_vec())).unwrap();
        let mut encrypt = Dict::new();
        encrypt.insert("Filter".to_string(), Object::name("Standard"));
        encrypt.insert("O".to_string(), Object::String(b"owner".to_vec()));
        let encrypt_ref = writer.add_object(Object::Dictionary(encrypt));
        writer.set_encryption(Box::new(Rot13), encrypt_ref).unwrap();
        writer.set_file_id(b"abc".to_vec(), b"def".to_vec());

        let mut out = Vec::new();
        writer.write(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("(uryyb)"));
        assert!(text.contains("/O (owner)"));
        assert!(text.contains("/Encrypt 4 0 R"));
        assert!(text.contains("/ID [(abc) (def)]"));
    }
}
