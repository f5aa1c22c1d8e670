//! Image click-guard.
//!
//! Disables pointer interaction on every `<img>` nested inside an element
//! that carries a marker class (`no-click` by default), so clicks and hovers
//! pass through the image instead of opening it.
//!
//! ```
//! use docindex::guard::ClickGuard;
//!
//! let guard = ClickGuard::default();
//! let out = guard
//!     .apply(r#"<div class="no-click"><img id="a"></div><img id="b">"#)
//!     .unwrap();
//! assert_eq!(out.images_guarded, 1);
//! assert!(out.html.contains(r#"<img id="a" style="pointer-events: none;">"#));
//! assert!(out.html.contains(r#"<img id="b">"#));
//! ```

pub mod page;
pub mod tree;

pub use page::{Page, PageLoader, ReadyHook};
pub use tree::{FileOutcome, TreeOptions, TreeReport, guard_tree};

use crate::error::{DocIndexError, Result};
use lol_html::{RewriteStrSettings, element, rewrite_str};
use memchr::memmem;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Marker class used by the documentation theme
pub const DEFAULT_MARKER_CLASS: &str = "no-click";

const POINTER_EVENTS: &str = "pointer-events";
const DISABLED: &str = "pointer-events: none";

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("character reference pattern is valid")
});

static CLASS_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("class name pattern is valid")
});

/// Result of guarding one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub html: String,
    /// Images found inside marked containers
    pub images_guarded: usize,
    /// Whether the output differs from the input
    pub changed: bool,
}

/// Disables pointer events on images inside marked containers
#[derive(Debug, Clone)]
pub struct ClickGuard {
    marker_class: String,
    selector: String,
}

impl ClickGuard {
    /// Create a guard for a marker class. The class must be a plain CSS
    /// identifier.
    pub fn new(marker_class: &str) -> Result<Self> {
        if !CLASS_NAME_RE.is_match(marker_class) {
            return Err(DocIndexError::Rewrite(format!(
                "invalid marker class: {:?}",
                marker_class
            )));
        }
        Ok(Self {
            marker_class: marker_class.to_string(),
            selector: format!(".{} img", marker_class),
        })
    }

    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    /// Rewrite a page, setting `pointer-events: none` on every image nested
    /// in a marked container. Pages without the marker are returned as is.
    pub fn apply(&self, html: &str) -> Result<GuardOutcome> {
        if memmem::find(html.as_bytes(), self.marker_class.as_bytes()).is_none() {
            return Ok(GuardOutcome {
                html: html.to_string(),
                images_guarded: 0,
                changed: false,
            });
        }

        let mut images_guarded = 0usize;
        let output = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(self.selector.as_str(), |el| {
                    images_guarded += 1;
                    let current = el.get_attribute("style");
                    let style = disable_pointer_events(current.as_deref());
                    if current.as_deref() != Some(style.as_str()) {
                        el.set_attribute("style", &style)?;
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| DocIndexError::Rewrite(e.to_string()))?;

        trace!(images = images_guarded, marker = %self.marker_class, "guarded page");
        let changed = output != html;
        Ok(GuardOutcome {
            html: output,
            images_guarded,
            changed,
        })
    }
}

impl Default for ClickGuard {
    fn default() -> Self {
        Self {
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            selector: format!(".{} img", DEFAULT_MARKER_CLASS),
        }
    }
}

/// Merge `pointer-events: none` into a raw inline style attribute value.
///
/// The value is handled as it appears in the markup, character references
/// included. A style that already disables pointer events is returned
/// unchanged. Otherwise the declaration is appended, and only conflicting
/// `pointer-events` declarations are dropped.
pub fn disable_pointer_events(style: Option<&str>) -> String {
    let style = style.unwrap_or("");
    let declarations = split_declarations(style);
    let existing: Vec<&str> = declarations
        .iter()
        .copied()
        .filter(|decl| is_pointer_events(decl))
        .collect();

    if !existing.is_empty() && existing.iter().all(|decl| disables(decl)) {
        return style.to_string();
    }

    if existing.is_empty() {
        let base = style.trim_end();
        if base.is_empty() {
            return format!("{};", DISABLED);
        }
        let terminated = declarations.last().is_some_and(|decl| decl.trim().is_empty());
        let separator = if terminated { " " } else { "; " };
        return format!("{}{}{};", base, separator, DISABLED);
    }

    let kept: Vec<&str> = declarations
        .iter()
        .map(|decl| decl.trim())
        .filter(|decl| !decl.is_empty() && !is_pointer_events(decl))
        .collect();
    if kept.is_empty() {
        format!("{};", DISABLED)
    } else {
        format!("{}; {};", kept.join("; "), DISABLED)
    }
}

fn is_pointer_events(decl: &str) -> bool {
    decl.split_once(':')
        .is_some_and(|(property, _)| property.trim().eq_ignore_ascii_case(POINTER_EVENTS))
}

fn disables(decl: &str) -> bool {
    decl.split_once(':').is_some_and(|(_, value)| {
        value
            .split_whitespace()
            .next()
            .is_some_and(|v| v.eq_ignore_ascii_case("none"))
    })
}

/// Quote a character reference stands for, if any
fn entity_quote(entity: &str) -> Option<char> {
    match entity {
        "&quot;" | "&#34;" | "&#x22;" | "&#X22;" => Some('"'),
        "&apos;" | "&#39;" | "&#x27;" | "&#X27;" => Some('\''),
        _ => None,
    }
}

/// Split a raw style value into declarations on `;` separators that are
/// outside strings, parentheses and character references
fn split_declarations(style: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < style.len() {
        let rest = &style[i..];
        let (ch, len) = match ENTITY_RE.find(rest) {
            Some(m) => (entity_quote(m.as_str()).unwrap_or('&'), m.end()),
            None => match rest.chars().next() {
                Some(c) => (c, c.len_utf8()),
                None => break,
            },
        };

        if escaped {
            escaped = false;
        } else if let Some(q) = quote {
            if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
        } else {
            match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    declarations.push(&style[start..i]);
                    start = i + len;
                }
                _ => {}
            }
        }
        i += len;
    }
    declarations.push(&style[start..]);
    declarations
}
