//! Document outline (bookmarks) and named destinations.
//!
//! Both are read purely by following references from the catalog. Destinations
//! keep the page's [`ObjectRef`] rather than a page number, so a merger can retarget
//! them onto cloned pages by identity.
//!
//! PDF Spec: ISO 32000-1:2008, Section 12.3.2 (Destinations) and 12.3.3 (Document Outline)

use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Dict, Object, ObjectRef};
use indexmap::IndexMap;
use std::collections::HashSet;

/// An explicit destination: a page and how to display it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDestination {
    /// Target page
    pub page: ObjectRef,
    /// View type and its parameters, e.g. `/XYZ 0 792 null`
    pub view: Vec<Object>,
}

impl PageDestination {
    /// Destination showing the whole page.
    pub fn fit(page: ObjectRef) -> Self {
        Self {
            page,
            view: vec![Object::name("Fit")],
        }
    }

    /// Read a destination array (or a dictionary with `/D`).
    ///
    /// Remote destinations that name a page by number are not page references and
    /// yield `None`.
    pub fn from_object(obj: &Object) -> Option<Self> {
        let array = match obj {
            Object::Array(items) => items,
            Object::Dictionary(dict) => return dict.get("D").and_then(Self::from_object),
            _ => return None,
        };
        let (first, view) = array.split_first()?;
        Some(Self {
            page: first.as_reference()?,
            view: view.to_vec(),
        })
    }

    /// Destination array `[page view...]`.
    pub fn to_object(&self) -> Object {
        let mut items = Vec::with_capacity(self.view.len() + 1);
        items.push(Object::Reference(self.page));
        items.extend(self.view.iter().cloned());
        Object::Array(items)
    }
}

/// Destination of an outline item.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Explicit page destination
    Page(PageDestination),
    /// Named destination, looked up in [`PdfDocument::named_destinations`]
    Named(String),
}

/// A single outline item (bookmark) in the document hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    /// The title of this bookmark
    pub title: String,

    /// Where the bookmark points; `None` for items without a usable target
    pub dest: Option<Destination>,

    /// Child bookmarks under this item
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Page this item targets, resolving named destinations through `names`.
    pub fn target_page(&self, names: &IndexMap<String, PageDestination>) -> Option<ObjectRef> {
        match &self.dest {
            Some(Destination::Page(dest)) => Some(dest.page),
            Some(Destination::Named(name)) => names.get(name).map(|d| d.page),
            None => None,
        }
    }
}

impl PdfDocument {
    /// Named destinations in document order.
    ///
    /// Reads the `/Names /Dests` name tree first, then the PDF 1.1 `/Dests`
    /// dictionary of the catalog; a name found in both keeps the name-tree entry.
    pub fn named_destinations(&self) -> Result<IndexMap<String, PageDestination>> {
        let catalog = self.catalog()?;
        let mut dests = IndexMap::new();

        if let Some(names) = catalog.get("Names") {
            let names = self.resolve(names)?;
            if let Some(tree) = names.get("Dests") {
                let mut visited = HashSet::new();
                self.collect_name_tree(tree, 0, &mut visited, &mut dests)?;
            }
        }

        if let Some(old_style) = catalog.get("Dests") {
            let old_style = self.resolve(old_style)?;
            if let Some(dict) = old_style.as_dict() {
                let mut keys: Vec<&String> = dict.keys().collect();
                keys.sort();
                for key in keys {
                    let value = self.resolve(&dict[key])?;
                    if let Some(dest) = PageDestination::from_object(&value) {
                        dests.entry(key.clone()).or_insert(dest);
                    }
                }
            }
        }

        log::debug!("Found {} named destinations", dests.len());
        Ok(dests)
    }

    fn collect_name_tree(
        &self,
        node: &Object,
        depth: u32,
        visited: &mut HashSet<ObjectRef>,
        dests: &mut IndexMap<String, PageDestination>,
    ) -> Result<()> {
        if let Object::Reference(r) = node {
            if !visited.insert(*r) {
                return self
                    .options()
                    .tolerate(format!("Name tree node {} visited twice", r));
            }
        }
        if depth > self.options().max_recursion_depth {
            return self.options().tolerate("Name tree too deep");
        }

        let node = self.resolve(node)?;
        let Some(dict) = node.as_dict() else {
            return Ok(());
        };

        if let Some(names) = dict.get("Names") {
            let names = self.resolve(names)?;
            for pair in names.as_array().map(|a| a.as_slice()).unwrap_or(&[]).chunks(2) {
                let [key, value] = pair else {
                    log::warn!("Odd number of entries in name tree leaf");
                    break;
                };
                let Some(name) = self.resolve(key)?.as_text() else {
                    continue;
                };
                match PageDestination::from_object(&self.resolve(value)?) {
                    Some(dest) => {
                        dests.entry(name).or_insert(dest);
                    },
                    None => log::debug!("Named destination {:?} has no page reference", name),
                }
            }
        }

        if let Some(kids) = dict.get("Kids") {
            let kids = self.resolve(kids)?;
            for kid in kids.as_array().map(|a| a.as_slice()).unwrap_or(&[]) {
                self.collect_name_tree(kid, depth + 1, visited, dests)?;
            }
        }
        Ok(())
    }

    /// Get the document outline (bookmarks); empty when the document has none.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdf_objgraph::document::PdfDocument;
    ///
    /// let doc = PdfDocument::open("sample.pdf")?;
    /// for item in doc.outline()? {
    ///     println!("Bookmark: {}", item.title);
    /// }
    /// # Ok::<(), pdf_objgraph::error::Error>(())
    /// ```
    pub fn outline(&self) -> Result<Vec<OutlineItem>> {
        let catalog = self.catalog()?;
        let Some(outlines) = catalog.get("Outlines") else {
            return Ok(Vec::new());
        };
        let outlines = self.resolve(outlines)?;
        let mut visited = HashSet::new();
        self.read_outline_level(outlines.as_dict(), 0, &mut visited)
    }

    /// Read the `/First` .. `/Next` chain under `parent`.
    fn read_outline_level(
        &self,
        parent: Option<&Dict>,
        depth: u32,
        visited: &mut HashSet<ObjectRef>,
    ) -> Result<Vec<OutlineItem>> {
        let mut items = Vec::new();
        if depth > self.options().max_recursion_depth {
            self.options().tolerate("Outline nested too deep")?;
            return Ok(items);
        }

        let mut current = parent.and_then(|p| p.get("First")).and_then(|f| f.as_reference());
        while let Some(item_ref) = current {
            if !visited.insert(item_ref) {
                self.options()
                    .tolerate(format!("Outline item {} visited twice", item_ref))?;
                break;
            }
            let item = self.get_object(item_ref)?;
            let Some(dict) = item.as_dict() else {
                self.options()
                    .tolerate(format!("Outline item {} is not a dictionary", item_ref))?;
                break;
            };

            items.push(OutlineItem {
                title: dict
                    .get("Title")
                    .map(|t| self.resolve(t))
                    .transpose()?
                    .and_then(|t| t.as_text())
                    .unwrap_or_default(),
                dest: self.outline_destination(dict)?,
                children: self.read_outline_level(Some(dict), depth + 1, visited)?,
            });
            current = dict.get("Next").and_then(|n| n.as_reference());
        }
        Ok(items)
    }

    /// `/Dest`, or the `/D` of a `/GoTo` action.
    fn outline_destination(&self, item: &Dict) -> Result<Option<Destination>> {
        let target = match item.get("Dest") {
            Some(dest) => self.resolve(dest)?,
            None => match item.get("A") {
                Some(action) => {
                    let action = self.resolve(action)?;
                    match (action.get("S").and_then(|s| s.as_name()), action.get("D")) {
                        (Some("GoTo"), Some(d)) => self.resolve(d)?,
                        _ => return Ok(None),
                    }
                },
                None => return Ok(None),
            },
        };

        Ok(match &target {
            Object::String(_) => target.as_text().map(Destination::Named),
            Object::Name(name) => Some(Destination::Named(name.clone())),
            other => PageDestination::from_object(other).map(Destination::Page),
        })
    }
}
