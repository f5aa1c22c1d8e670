use crate::error::{DocIndexError, Result};
use crate::guard::ClickGuard;
use crate::index::writer::replace_file;
use crate::utils::progress::file_progress;
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How to run the guard over a built documentation tree
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Glob, relative to the root, selecting pages to process
    pub glob: String,
    /// Write changed pages back in place; when false only report
    pub write: bool,
    pub parallel: bool,
    pub show_progress: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            glob: "**/*.html".to_string(),
            write: true,
            parallel: true,
            show_progress: false,
        }
    }
}

/// Per-file result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub images_guarded: usize,
    pub changed: bool,
}

#[derive(Debug, Default)]
pub struct TreeReport {
    pub files: Vec<FileOutcome>,
    pub errors: Vec<(PathBuf, String)>,
}

impl TreeReport {
    pub fn changed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.changed)
    }

    pub fn images_guarded(&self) -> usize {
        self.files.iter().map(|f| f.images_guarded).sum()
    }
}

/// Collect pages under `root` matching the glob, along with any entries the
/// walk could not read. A file root is returned as is.
fn collect_pages(root: &Path, matcher: &GlobMatcher) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    if root.is_file() {
        return (vec![root.to_path_buf()], Vec::new());
    }

    // Built output is usually git-ignored, so ignore files are not honored
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .build();

    let mut pages = Vec::new();
    let mut errors = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                errors.push(walk_error(&err, root));
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if matcher.is_match(rel) {
            pages.push(entry.path().to_path_buf());
        }
    }
    pages.sort();
    (pages, errors)
}

/// Report entry for a failed walk step, attributed to the deepest path the
/// error names
fn walk_error(err: &ignore::Error, root: &Path) -> (PathBuf, String) {
    let path = error_path(err).unwrap_or(root);
    (path.to_path_buf(), err.to_string())
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

fn guard_file(path: &Path, guard: &ClickGuard, write: bool) -> Result<FileOutcome> {
    let html = fs::read_to_string(path)?;
    let outcome = guard.apply(&html)?;
    if outcome.changed && write {
        replace_file(path, outcome.html.as_bytes())?;
    }
    Ok(FileOutcome {
        path: path.to_path_buf(),
        images_guarded: outcome.images_guarded,
        changed: outcome.changed,
    })
}

/// Apply the click-guard to every matching page under `root`.
///
/// Per-file failures are collected in the report rather than aborting the run.
pub fn guard_tree(root: &Path, guard: &ClickGuard, options: &TreeOptions) -> Result<TreeReport> {
    if !root.exists() {
        return Err(DocIndexError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", root.display()),
        )));
    }
    let matcher = Glob::new(&options.glob)?.compile_matcher();
    let (pages, walk_errors) = collect_pages(root, &matcher);
    debug!(root = %root.display(), pages = pages.len(), "guarding pages");

    let progress = file_progress(pages.len(), options.show_progress);
    let run = |path: &PathBuf| {
        let result = guard_file(path, guard, options.write);
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        (path.clone(), result)
    };

    let results: Vec<(PathBuf, Result<FileOutcome>)> = if options.parallel {
        pages.par_iter().map(run).collect()
    } else {
        pages.iter().map(run).collect()
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let mut report = TreeReport::default();
    for (path, error) in walk_errors {
        warn!(path = %path.display(), error = %error, "failed to read directory entry");
        report.errors.push((path, error));
    }
    for (path, result) in results {
        match result {
            Ok(outcome) => report.files.push(outcome),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to guard page");
                report.errors.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}
