// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::redundant_guards)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Object Graph
//!
//! The object-graph core of a PDF toolkit: reading the cross-reference structure of
//! real-world (often damaged) files, resolving indirect objects lazily, and writing
//! new documents that copy pages out of existing ones.
//!
//! ## Core Features
//!
//! ### Reading
//! - **Tokenizer**: one structured value at a time, with stream-length recovery
//! - **Cross-Reference Resolver**: classic tables, xref streams, hybrid files and
//!   `/Prev` chains; off-by-one `startxref` repair and full rebuild by scanning
//! - **Object Store**: lazy, memoizing and reference-stable; decrypts through a
//!   pluggable security handler
//! - **Navigation**: page tree, outline and named destinations
//!
//! ### Writing
//! - **Reference Sweep**: copies every object a page reaches, once, cycles included
//! - **Merging**: pages from several documents with retargeted bookmarks
//!
//! Every repair heuristic obeys [`ParserOptions::strict`]: strict mode raises a
//! [`Error::ReadError`], permissive mode logs a warning through the `log` facade
//! and carries on.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_objgraph::{PdfDocument, PdfMerger};
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let first = Rc::new(PdfDocument::open("a.pdf")?);
//! let second = Rc::new(PdfDocument::open("b.pdf")?);
//! println!("{} + {} pages", first.page_count()?, second.page_count()?);
//!
//! let mut merger = PdfMerger::new();
//! merger.append(first, None, true)?;
//! merger.append(second, Some(0..1), true)?;
//! merger.write(std::fs::File::create("merged.pdf")?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Encryption support
pub mod encryption;

// Document navigation
pub mod outline;

// PDF writing and merging
pub mod writer;

// Re-exports
pub use document::PdfDocument;
pub use error::{Error, Result};
pub use object::{Dict, DocumentId, Object, ObjectRef, ObjectResolver};
pub use outline::{Destination, OutlineItem, PageDestination};
pub use parser_config::ParserOptions;
pub use writer::{PdfMerger, PdfWriter, WriterConfig};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
