//! PDF writing: the output object table, reference sweep, merging and serialization.
//!
//! ## Architecture
//!
//! ```text
//! PdfDocument (sources, shared as Rc)
//!     ↓
//! [PdfMerger] (which pages go where; outline and named destinations)
//!     ↓
//! [PdfWriter] (output table; sweep copies reachable source objects)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Low-Level API (PdfWriter)
//!
//! ```no_run
//! use pdf_objgraph::document::PdfDocument;
//! use pdf_objgraph::writer::PdfWriter;
//! use std::rc::Rc;
//!
//! let source = Rc::new(PdfDocument::open("input.pdf")?);
//! let mut writer = PdfWriter::new();
//! for page in source.page_refs()?.into_iter().rev() {
//!     writer.add_page_from(&source, page)?;
//! }
//! writer.write_to_path("reversed.pdf")?;
//! # Ok::<(), pdf_objgraph::error::Error>(())
//! ```

mod merger;
mod object_serializer;
mod pdf_writer;

pub use merger::{OutlineHandle, PdfMerger};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PdfWriter, WriterConfig};
