//! Merging pages of several documents into one.
//!
//! [`PdfMerger`] records which pages of which sources go where; nothing is copied
//! until [`PdfMerger::write`]. At that point every page is copied into a fresh
//! [`PdfWriter`], and named destinations and outline items that pointed at source
//! pages are retargeted onto the copies by page identity.
//!
//! # Example
//!
//! ```no_run
//! use pdf_objgraph::document::PdfDocument;
//! use pdf_objgraph::writer::PdfMerger;
//! use std::rc::Rc;
//!
//! let cover = Rc::new(PdfDocument::open("cover.pdf")?);
//! let report = Rc::new(PdfDocument::open("report.pdf")?);
//!
//! let mut merger = PdfMerger::new();
//! merger.append(report, None, true)?;
//! merger.merge(0, cover, None, false)?;
//! merger.write(std::fs::File::create("merged.pdf")?)?;
//! # Ok::<(), pdf_objgraph::error::Error>(())
//! ```

use super::pdf_writer::{PdfWriter, WriterConfig};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::outline::{Destination, OutlineItem, PageDestination};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::ops::Range;
use std::rc::Rc;

/// Handle to an outline item added with [`PdfMerger::add_outline_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineHandle(usize);

#[derive(Debug, Clone)]
enum OutlineTarget {
    None,
    /// A source page, by identity
    Source(PageDestination),
    /// A named destination of the merged output
    Named(String),
    /// An output page index
    Page(usize),
}

#[derive(Debug, Clone)]
struct OutlineNode {
    title: String,
    target: OutlineTarget,
    children: Vec<usize>,
}

struct PageRecord {
    source: Rc<PdfDocument>,
    page: ObjectRef,
}

/// Merges pages, named destinations and outlines of several documents.
pub struct PdfMerger {
    config: WriterConfig,
    pages: Vec<PageRecord>,
    named_dests: IndexMap<String, PageDestination>,
    /// Outline arena; `outline_roots` lists the top level
    outline: Vec<OutlineNode>,
    outline_roots: Vec<usize>,
    info: Vec<(String, Object)>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    /// Create an empty merger with the default writer config.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Create an empty merger whose output uses `config`.
    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            named_dests: IndexMap::new(),
            outline: Vec::new(),
            outline_roots: Vec::new(),
            info: Vec::new(),
        }
    }

    /// Number of pages merged so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Insert pages of `source` at output page `position` (clamped to the page count).
    ///
    /// `pages` selects a range of source pages (all when `None`). Named destinations
    /// of the source that target a selected page are kept; with `import_outline`, so
    /// are outline items whose target, or some descendant's target, is selected.
    ///
    /// # Errors
    ///
    /// `ReadError` if the range exceeds the source's page count, plus any error from
    /// reading the source's page tree, names or outline.
    pub fn merge(
        &mut self,
        position: usize,
        source: Rc<PdfDocument>,
        pages: Option<Range<usize>>,
        import_outline: bool,
    ) -> Result<()> {
        let all_pages = source.page_refs()?;
        let range = pages.unwrap_or(0..all_pages.len());
        if range.start > range.end || range.end > all_pages.len() {
            return Err(Error::ReadError(format!(
                "Page range {:?} outside document with {} pages",
                range,
                all_pages.len()
            )));
        }
        let selected = &all_pages[range.clone()];
        let kept: HashSet<ObjectRef> = selected.iter().copied().collect();

        let source_names = source.named_destinations()?;
        for (name, dest) in &source_names {
            if !kept.contains(&dest.page) {
                continue;
            }
            if self.named_dests.contains_key(name) {
                log::warn!("Named destination {:?} already defined; keeping the first", name);
                continue;
            }
            self.named_dests.insert(name.clone(), dest.clone());
        }

        if import_outline {
            let outline = source.outline()?;
            let roots = self.import_outline_level(&outline, &kept, &source_names);
            self.outline_roots.extend(roots);
        }

        let position = position.min(self.pages.len());
        let records = selected.iter().map(|&page| PageRecord {
            source: Rc::clone(&source),
            page,
        });
        self.pages.splice(position..position, records);

        log::debug!(
            "Merged pages {:?} of {:?} at position {}",
            range,
            source.id(),
            position
        );
        Ok(())
    }

    /// Append pages of `source` after the pages merged so far.
    pub fn append(&mut self, source: Rc<PdfDocument>, pages: Option<Range<usize>>, import_outline: bool) -> Result<()> {
        let position = self.pages.len();
        self.merge(position, source, pages, import_outline)
    }

    /// Copy the items of one outline level into the arena, dropping items that
    /// lead nowhere inside `kept`. Returns the arena indices of the kept items.
    fn import_outline_level(
        &mut self,
        items: &[OutlineItem],
        kept: &HashSet<ObjectRef>,
        names: &IndexMap<String, PageDestination>,
    ) -> Vec<usize> {
        let mut level = Vec::new();
        for item in items {
            let children = self.import_outline_level(&item.children, kept, names);
            let target = match &item.dest {
                Some(Destination::Page(dest)) if kept.contains(&dest.page) => OutlineTarget::Source(dest.clone()),
                Some(Destination::Named(name)) if item.target_page(names).is_some_and(|p| kept.contains(&p)) => {
                    OutlineTarget::Named(name.clone())
                },
                _ => OutlineTarget::None,
            };
            if matches!(target, OutlineTarget::None) && children.is_empty() {
                continue;
            }
            self.outline.push(OutlineNode {
                title: item.title.clone(),
                target,
                children,
            });
            level.push(self.outline.len() - 1);
        }
        level
    }

    /// Add an outline item pointing at output page `page_index`, at the top level
    /// or under `parent`.
    ///
    /// The index is resolved when the output is written.
    pub fn add_outline_item(
        &mut self,
        title: impl Into<String>,
        page_index: usize,
        parent: Option<OutlineHandle>,
    ) -> Result<OutlineHandle> {
        let index = self.outline.len();
        match parent {
            Some(OutlineHandle(p)) => match self.outline.get_mut(p) {
                Some(node) => node.children.push(index),
                None => {
                    return Err(Error::InvalidObjectType {
                        expected: "outline item of this merger".to_string(),
                        found: format!("outline handle {}", p),
                    })
                },
            },
            None => self.outline_roots.push(index),
        }
        self.outline.push(OutlineNode {
            title: title.into(),
            target: OutlineTarget::Page(page_index),
            children: Vec::new(),
        });
        Ok(OutlineHandle(index))
    }

    /// Set an entry of the output's document information dictionary.
    pub fn set_info_entry(&mut self, key: impl Into<String>, value: Object) {
        self.info.push((key.into(), value));
    }

    /// Copy every page, retarget destinations and outline, and serialize.
    pub fn write<W: Write>(&self, w: W) -> Result<()> {
        let mut writer = self.build()?;
        writer.write(w)
    }

    /// Assemble the output table without serializing it.
    pub fn build(&self) -> Result<PdfWriter> {
        let mut writer = PdfWriter::with_config(self.config.clone());

        let mut page_map: HashMap<ObjectRef, ObjectRef> = HashMap::new();
        for record in &self.pages {
            let copy = writer.add_page_from(&record.source, record.page)?;
            page_map.entry(record.page).or_insert(copy);
        }
        let output_pages = writer.page_refs().to_vec();

        let mut names_tree = Vec::new();
        let mut written_names = HashSet::new();
        let mut sorted: Vec<(&String, &PageDestination)> = self.named_dests.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (name, dest) in sorted {
            let Some(&page) = page_map.get(&dest.page) else {
                log::debug!("Dropping named destination {:?}: page not in output", name);
                continue;
            };
            let retargeted = PageDestination {
                page,
                view: dest.view.clone(),
            };
            names_tree.push(Object::text(name));
            names_tree.push(retargeted.to_object());
            written_names.insert(name.as_str());
        }

        let root = writer.root_ref();
        if !names_tree.is_empty() {
            let mut leaf = Dict::new();
            leaf.insert("Names".to_string(), Object::Array(names_tree));
            let dests = writer.add_object(Object::Dictionary(leaf));
            let mut names = Dict::new();
            names.insert("Dests".to_string(), Object::Reference(dests));
            set_catalog_entry(&mut writer, root, "Names", Object::Dictionary(names))?;
        }

        if !self.outline_roots.is_empty() {
            let outlines = writer.add_object(Object::Null);
            let targets = OutlineTargets {
                page_map: &page_map,
                output_pages: &output_pages,
                names: &written_names,
            };
            let (first_last, count) = self.write_outline_level(&mut writer, outlines, &self.outline_roots, &targets)?;

            let mut dict = Dict::new();
            dict.insert("Type".to_string(), Object::name("Outlines"));
            if let Some((first, last)) = first_last {
                dict.insert("First".to_string(), Object::Reference(first));
                dict.insert("Last".to_string(), Object::Reference(last));
                dict.insert("Count".to_string(), Object::Integer(count));
            }
            *writer.get_object_mut(outlines)? = Object::Dictionary(dict);
            set_catalog_entry(&mut writer, root, "Outlines", Object::Reference(outlines))?;
        }

        for (key, value) in &self.info {
            writer.set_info_entry(key.clone(), value.clone())?;
        }
        Ok(writer)
    }

    /// Write one outline level under `parent`; slots are reserved for all siblings
    /// first so `/Prev` and `/Next` can point forward.
    ///
    /// Returns the first and last item and the number of visible descendants.
    fn write_outline_level(
        &self,
        writer: &mut PdfWriter,
        parent: ObjectRef,
        level: &[usize],
        targets: &OutlineTargets<'_>,
    ) -> Result<(Option<(ObjectRef, ObjectRef)>, i64)> {
        let refs: Vec<ObjectRef> = level.iter().map(|_| writer.add_object(Object::Null)).collect();
        let mut count = refs.len() as i64;

        for (i, &node_index) in level.iter().enumerate() {
            let node = &self.outline[node_index];
            let mut dict = Dict::new();
            dict.insert("Title".to_string(), Object::text(&node.title));
            dict.insert("Parent".to_string(), Object::Reference(parent));
            if i > 0 {
                dict.insert("Prev".to_string(), Object::Reference(refs[i - 1]));
            }
            if let Some(next) = refs.get(i + 1) {
                dict.insert("Next".to_string(), Object::Reference(*next));
            }
            if let Some(dest) = targets.resolve(&node.target, &node.title) {
                dict.insert("Dest".to_string(), dest);
            }

            let (children, descendants) = self.write_outline_level(writer, refs[i], &node.children, targets)?;
            if let Some((first, last)) = children {
                dict.insert("First".to_string(), Object::Reference(first));
                dict.insert("Last".to_string(), Object::Reference(last));
                dict.insert("Count".to_string(), Object::Integer(descendants));
                count += descendants;
            }
            *writer.get_object_mut(refs[i])? = Object::Dictionary(dict);
        }

        Ok((refs.first().copied().zip(refs.last().copied()), count))
    }
}

/// Lookup tables for turning outline targets into output destinations.
struct OutlineTargets<'a> {
    page_map: &'a HashMap<ObjectRef, ObjectRef>,
    output_pages: &'a [ObjectRef],
    names: &'a HashSet<&'a str>,
}

impl OutlineTargets<'_> {
    fn resolve(&self, target: &OutlineTarget, title: &str) -> Option<Object> {
        let dest = match target {
            OutlineTarget::None => return None,
            OutlineTarget::Source(dest) => self.page_map.get(&dest.page).map(|&page| {
                PageDestination {
                    page,
                    view: dest.view.clone(),
                }
                .to_object()
            }),
            OutlineTarget::Named(name) => self.names.contains(name.as_str()).then(|| Object::text(name)),
            OutlineTarget::Page(index) => self
                .output_pages
                .get(*index)
                .map(|&page| PageDestination::fit(page).to_object()),
        };
        if dest.is_none() {
            log::warn!("Outline item {:?} has no target in the output", title);
        }
        dest
    }
}

fn set_catalog_entry(writer: &mut PdfWriter, root: ObjectRef, key: &str, value: Object) -> Result<()> {
    match writer.get_object_mut(root)?.as_dict_mut() {
        Some(catalog) => {
            catalog.insert(key.to_string(), value);
            Ok(())
        },
        None => Err(Error::InvalidObjectType {
            expected: "Catalog dictionary".to_string(),
            found: "replaced catalog".to_string(),
        }),
    }
}
