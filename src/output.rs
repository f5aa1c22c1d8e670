//! Terminal output for command results

use crate::guard::TreeReport;
use crate::index::{ObjectDiff, ObjectRecord, SearchIndex, TermMatch, ValidationReport};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn status(stdout: &mut StandardStream, ok: bool, label: &str) -> io::Result<()> {
    let color = if ok { Color::Green } else { Color::Red };
    stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stdout, "{}", label)?;
    stdout.reset()
}

/// Print validation results, one line per violation
pub fn print_validation(report: &ValidationReport, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    for violation in &report.violations {
        status(&mut stdout, false, "error")?;
        writeln!(stdout, ": {}", violation)?;
    }

    status(&mut stdout, report.is_valid(), if report.is_valid() { "ok" } else { "invalid" })?;
    writeln!(
        stdout,
        ": {} documents, {} references checked, {} violation(s)",
        report.documents,
        report.references_checked,
        report.violations.len()
    )?;
    Ok(())
}

/// Print differences between documented and expected symbols
pub fn print_object_diff(diff: &ObjectDiff, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    for name in &diff.missing {
        status(&mut stdout, false, "missing")?;
        writeln!(stdout, ": {}", name)?;
    }
    for name in &diff.unexpected {
        status(&mut stdout, false, "unexpected")?;
        writeln!(stdout, ": {}", name)?;
    }
    if diff.is_exact() {
        status(&mut stdout, true, "ok")?;
        writeln!(stdout, ": object table matches the expected entry points")?;
    }
    Ok(())
}

/// Print the documents a word resolves to
pub fn print_term_match(hit: &TermMatch<'_>, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(stdout, "{}", hit.word)?;
    stdout.reset()?;
    if hit.is_empty() {
        writeln!(stdout, ": no matches")?;
        return Ok(());
    }
    writeln!(stdout)?;

    for doc in &hit.title_documents {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(stdout, "  title ")?;
        stdout.reset()?;
        writeln!(stdout, "{} ({})", doc.filename, doc.title)?;
    }
    for doc in &hit.documents {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "  text  ")?;
        stdout.reset()?;
        writeln!(stdout, "{} ({})", doc.filename, doc.title)?;
    }
    Ok(())
}

/// Print the object table as `name  kind  file#anchor`
pub fn print_objects(index: &SearchIndex, objects: &[ObjectRecord<'_>], color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    let width = objects.iter().map(|o| o.name.len()).max().unwrap_or(0);

    for object in objects {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(stdout, "{:width$}", object.name, width = width)?;
        stdout.reset()?;
        write!(stdout, "  {:14}", object.kind.unwrap_or("?"))?;
        match index.document(object.doc_id) {
            Some(doc) => writeln!(stdout, "  {}#{}", doc.docname, object.anchor)?,
            None => writeln!(stdout, "  <document {}>#{}", object.doc_id, object.anchor)?,
        }
    }
    Ok(())
}

/// Print a click-guard run over a tree
pub fn print_guard_report(report: &TreeReport, wrote: bool, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);

    for file in report.changed_files() {
        status(&mut stdout, true, if wrote { "guarded" } else { "would guard" })?;
        writeln!(stdout, ": {} ({} image(s))", file.path.display(), file.images_guarded)?;
    }
    for (path, error) in &report.errors {
        status(&mut stdout, false, "error")?;
        writeln!(stdout, ": {}: {}", path.display(), error)?;
    }

    writeln!(
        stdout,
        "{} page(s) scanned, {} changed, {} image(s) inside marked containers",
        report.files.len(),
        report.changed_files().count(),
        report.images_guarded()
    )?;
    Ok(())
}
