pub mod build;
pub mod reader;
pub mod stats;
pub mod types;
pub mod validate;
pub mod writer;

pub use build::{IndexBuilder, ObjectKind, SiteManifest};
pub use reader::{IndexReader, TermMatch, parse_index};
pub use types::*;
pub use validate::{ObjectDiff, ValidationReport, Violation, check_objects, validate};
pub use writer::{IndexWriter, to_js};
