//! Utility functions shared by the index and click-guard modules.
//!
//! - [`app_data`] - Application config in the platform data directory
//! - [`progress`] - Progress bars that compile away without the `progress` feature
//! - [`tokenizer`] - Word splitting, stemming and stop-word filtering
//!
//! ```
//! use docindex::utils::{TermNormalizer, split_words};
//!
//! let words: Vec<_> = split_words("Calculating risk").collect();
//! assert_eq!(words, vec!["Calculating", "risk"]);
//!
//! let normalizer = TermNormalizer::english();
//! assert_eq!(normalizer.term("patients").as_deref(), Some("patient"));
//! ```

pub mod app_data;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use tokenizer::*;
