use crate::error::Result;
use crate::guard::ClickGuard;
use tracing::debug;

/// A loaded page whose document structure hooks may rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    html: String,
    ready_fired: bool,
}

impl Page {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ready_fired: false,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Whether the ready hooks have already run for this load
    pub fn is_ready(&self) -> bool {
        self.ready_fired
    }

    pub fn replace_html(&mut self, html: String) {
        self.html = html;
    }
}

/// Initialization hook run once the page structure is available
pub trait ReadyHook: Send + Sync {
    fn on_ready(&self, page: &mut Page) -> Result<()>;
}

impl ReadyHook for ClickGuard {
    fn on_ready(&self, page: &mut Page) -> Result<()> {
        let outcome = self.apply(page.html())?;
        debug!(images = outcome.images_guarded, "click-guard ran");
        if outcome.changed {
            page.replace_html(outcome.html);
        }
        Ok(())
    }
}

/// Host side of the page lifecycle: owns the registered hooks and fires them
/// exactly once per page load
#[derive(Default)]
pub struct PageLoader {
    hooks: Vec<Box<dyn ReadyHook>>,
}

impl PageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: impl ReadyHook + 'static) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Load a page and fire the ready hooks on it
    pub fn load(&self, html: impl Into<String>) -> Result<Page> {
        let mut page = Page::new(html);
        self.fire_ready(&mut page)?;
        Ok(page)
    }

    /// Fire ready hooks in registration order. Returns `false` without
    /// running anything if this page has already fired.
    pub fn fire_ready(&self, page: &mut Page) -> Result<bool> {
        if page.ready_fired {
            return Ok(false);
        }
        page.ready_fired = true;
        for hook in &self.hooks {
            hook.on_ready(page)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl ReadyHook for Counter {
        fn on_ready(&self, _page: &mut Page) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_ready_fires_once_per_load() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut loader = PageLoader::new();
        loader.register(Counter(count.clone()));

        let mut page = loader.load("<p>hi</p>").unwrap();
        assert!(page.is_ready());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!loader.fire_ready(&mut page).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        loader.load("<p>again</p>").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_click_guard_as_hook() {
        let mut loader = PageLoader::new();
        loader.register(ClickGuard::default());

        let page = loader
            .load(r#"<div class="no-click"><img id="a"></div><img id="b">"#)
            .unwrap();
        assert!(page.html().contains(r#"<img id="a" style="pointer-events: none;">"#));
        assert!(page.html().contains(r#"<img id="b">"#));
    }

    #[test]
    fn test_no_hooks() {
        let loader = PageLoader::new();
        assert_eq!(loader.hook_count(), 0);
        let page = loader.load("<img>").unwrap();
        assert_eq!(page.into_html(), "<img>");
    }
}
