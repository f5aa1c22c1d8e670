//! Progress bar abstraction that becomes no-op when the `progress` feature is disabled

#[cfg(feature = "progress")]
pub use indicatif::{ProgressBar, ProgressStyle};

#[cfg(not(feature = "progress"))]
pub use self::noop::*;

/// Bar for a batch of files, or `None` when progress output is off or the
/// batch is too small to bother
pub fn file_progress(len: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || len < 2 {
        return None;
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("█▓▒░  "));
    }
    pb.set_message("pages");
    Some(pb)
}

#[cfg(not(feature = "progress"))]
mod noop {
    /// No-op progress bar when `progress` feature is disabled
    #[derive(Clone)]
    pub struct ProgressBar;

    impl ProgressBar {
        pub fn new(_len: u64) -> Self {
            ProgressBar
        }

        pub fn set_style(&self, _style: ProgressStyle) {}
        pub fn set_message(&self, _msg: impl Into<std::borrow::Cow<'static, str>>) {}
        pub fn inc(&self, _delta: u64) {}
        pub fn finish_and_clear(&self) {}
    }

    /// No-op progress style
    pub struct ProgressStyle;

    impl ProgressStyle {
        pub fn default_bar() -> Self {
            ProgressStyle
        }

        pub fn template(self, _template: &str) -> Result<Self, std::convert::Infallible> {
            Ok(self)
        }

        pub fn progress_chars(self, _chars: &str) -> Self {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_or_tiny_batches_have_no_bar() {
        assert!(file_progress(100, false).is_none());
        assert!(file_progress(1, true).is_none());
    }
}
