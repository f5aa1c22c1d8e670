//! # docindex - documentation search index toolkit
//!
//! docindex reads, validates, generates and rewrites the client-side search
//! index (`searchindex.js`) of a static documentation site, and applies the
//! site's image click-guard to built HTML pages.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Index model, reader, writer, builder and validation
//! - [`guard`] - Click-guard for images inside `no-click` containers
//! - [`output`] - Colored terminal output for command results
//! - [`utils`] - Tokenizer, configuration and progress helpers
//! - [`error`] - Library error type
//!
//! ## Quick Start
//!
//! ```no_run
//! use docindex::index::{IndexReader, validate};
//! use std::path::Path;
//!
//! let reader = IndexReader::open(Path::new("docs/searchindex.js")).unwrap();
//! let report = validate(reader.index());
//! assert!(report.is_valid());
//!
//! for doc in reader.lookup("risk").documents {
//!     println!("{} - {}", doc.filename, doc.title);
//! }
//! ```
//!
//! ## Index lifecycle
//!
//! An index is generated in full, read many times and never edited. The
//! [`index::SearchIndex`] type therefore has no mutating API; a changed site
//! produces a fresh index through [`index::IndexBuilder`].

pub mod error;
pub mod guard;
pub mod index;
pub mod output;
pub mod utils;

pub use error::{DocIndexError, Result};
