//! Integration tests driving the docindex binary.
//!
//! Every command runs with a private data directory so a user config on the
//! host machine cannot change the results.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const KFRE_API: &str = "add_kfre_risk_col,class_esrd_outcome,eval_kfre_metrics,kfre_person,\
                        perform_conversions,plot_kfre_metrics,upcr_uacr";

fn docindex_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docindex"))
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("kfre_searchindex.js")
}

/// Run docindex and return (stdout, stderr, success)
fn run_docindex(args: &[&str], home: &Path) -> (String, String, bool) {
    let output = Command::new(docindex_binary())
        .arg("--no-color")
        .args(args)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run docindex");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn fixture_arg() -> String {
    fixture_path().to_string_lossy().to_string()
}

#[test]
fn test_check_fixture() {
    let home = TempDir::new().unwrap();
    let (out, _, ok) = run_docindex(&["check", &fixture_arg()], home.path());

    assert!(ok, "check should succeed: {}", out);
    assert!(out.starts_with("ok: 7 documents"), "unexpected output: {}", out);
    assert!(out.contains("0 violation(s)"));
}

#[test]
fn test_check_expected_objects() {
    let home = TempDir::new().unwrap();
    let expect = format!("--expect-objects={}", KFRE_API);
    let (out, _, ok) = run_docindex(&["check", &fixture_arg(), &expect], home.path());

    assert!(ok, "check should succeed: {}", out);
    assert!(out.contains("object table matches"));
}

#[test]
fn test_check_reports_missing_object() {
    let home = TempDir::new().unwrap();
    let expect = format!("--expect-objects={},kfre_batch", KFRE_API);
    let (out, _, ok) = run_docindex(&["check", &fixture_arg(), &expect], home.path());

    assert!(!ok, "check should fail when a symbol is missing");
    assert!(out.contains("missing: kfre_batch"), "unexpected output: {}", out);
}

#[test]
fn test_check_rejects_corrupt_index() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("searchindex.js");
    fs::write(&path, "Search.setIndex({\"docnames\": [\"index\"]").unwrap();

    let (_, err, ok) = run_docindex(&["check", &path.to_string_lossy()], home.path());
    assert!(!ok);
    assert!(err.contains("Failed to open index"), "unexpected stderr: {}", err);
}

#[test]
fn test_check_reports_dangling_document() {
    let home = TempDir::new().unwrap();
    let text = fs::read_to_string(fixture_path()).unwrap();
    let broken = text.replace("\"calcium\": 4", "\"calcium\": 9");
    assert_ne!(broken, text);
    let path = home.path().join("searchindex.js");
    fs::write(&path, broken).unwrap();

    let (out, _, ok) = run_docindex(&["check", &path.to_string_lossy()], home.path());
    assert!(!ok);
    assert!(out.contains("calcium"), "unexpected output: {}", out);
    assert!(out.contains("1 violation(s)"));
}

#[test]
fn test_stats() {
    let home = TempDir::new().unwrap();
    let (out, _, ok) = run_docindex(&["stats", &fixture_arg()], home.path());

    assert!(ok);
    assert!(out.contains("Documents:        7"));
    assert!(out.contains("Terms:            1295"));
    assert!(out.contains("Objects:          7"));
    assert!(out.contains("usage_guide.rst"));
}

#[test]
fn test_lookup() {
    let home = TempDir::new().unwrap();
    let (out, _, ok) = run_docindex(&["lookup", &fixture_arg(), "Patients", "dialysis"], home.path());

    assert!(ok);
    assert!(out.contains("title usage_guide.rst (Single Patient Risk Calculation)"));
    assert!(out.contains("text  getting_started.rst"));
    assert!(out.contains("text  index.rst"));
    assert!(out.contains("dialysis: no matches"));
}

#[test]
fn test_objects() {
    let home = TempDir::new().unwrap();
    let (out, _, ok) = run_docindex(&["objects", &fixture_arg()], home.path());

    assert!(ok);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("add_kfre_risk_col"));
    assert!(lines.iter().all(|l| l.contains("py:function")));
    assert!(out.contains("usage_guide#kfre_person"));
}

#[test]
fn test_fmt_preserves_bytes() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out").join("searchindex.js");
    let (_, err, ok) = run_docindex(
        &["fmt", &fixture_arg(), "-o", &output.to_string_lossy()],
        home.path(),
    );

    assert!(ok, "fmt failed: {}", err);
    assert_eq!(
        fs::read(&output).unwrap(),
        fs::read(fixture_path()).unwrap()
    );
}

#[test]
fn test_build_then_check() {
    let home = TempDir::new().unwrap();
    let manifest = home.path().join("site.json");
    fs::write(
        &manifest,
        r#"{
  "pages": [
    {
      "docname": "index",
      "title": "KFRE Documentation",
      "text": "Kidney failure risk for patients with chronic kidney disease."
    },
    {
      "docname": "usage_guide",
      "title": "Single Patient Risk Calculation",
      "sections": [
        {"title": "Phosphate", "anchor": "phosphate", "text": "Convert phosphate units."}
      ],
      "objects": [
        {"name": "kfre_person"},
        {"name": "upcr_uacr"}
      ]
    }
  ]
}"#,
    )
    .unwrap();
    let output = home.path().join("searchindex.js");

    let (out, err, ok) = run_docindex(
        &["build", &manifest.to_string_lossy(), "-o", &output.to_string_lossy()],
        home.path(),
    );
    assert!(ok, "build failed: {}", err);
    assert!(out.contains("2 documents"));

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("Search.setIndex({\"alltitles\": {"));
    assert!(text.contains("\"Phosphate\": [[1, \"phosphate\"]]"));

    let (out, _, ok) = run_docindex(
        &[
            "check",
            &output.to_string_lossy(),
            "--expect-objects",
            "kfre_person,upcr_uacr",
        ],
        home.path(),
    );
    assert!(ok, "generated index should validate: {}", out);

    let (out, _, ok) = run_docindex(&["lookup", &output.to_string_lossy(), "kidney"], home.path());
    assert!(ok);
    assert!(out.contains("text  index.rst"));
}

#[test]
fn test_build_rejects_empty_manifest() {
    let home = TempDir::new().unwrap();
    let manifest = home.path().join("site.json");
    fs::write(&manifest, r#"{"pages": []}"#).unwrap();
    let output = home.path().join("searchindex.js");

    let (_, err, ok) = run_docindex(
        &["build", &manifest.to_string_lossy(), "-o", &output.to_string_lossy()],
        home.path(),
    );
    assert!(!ok);
    assert!(err.contains("no pages"), "unexpected stderr: {}", err);
    assert!(!output.exists());
}

fn create_site(root: &Path) -> PathBuf {
    let page = root.join("site").join("usage_guide.html");
    fs::create_dir_all(page.parent().unwrap()).unwrap();
    fs::write(
        &page,
        r#"<html><body>
<div class="no-click"><p><img src="_images/flowchart.png" alt="flow"></p></div>
<img src="_images/logo.png">
</body></html>"#,
    )
    .unwrap();
    fs::write(root.join("site").join("plain.html"), "<p>No images here</p>").unwrap();
    page
}

#[test]
fn test_guard_check_then_write() {
    let home = TempDir::new().unwrap();
    let page = create_site(home.path());
    let site = home.path().join("site");
    let original = fs::read_to_string(&page).unwrap();

    let (out, _, ok) = run_docindex(&["guard", &site.to_string_lossy(), "--check"], home.path());
    assert!(!ok, "check mode should fail with pending changes");
    assert!(out.contains("would guard"));
    assert!(out.contains("2 page(s) scanned, 1 changed"));
    assert_eq!(fs::read_to_string(&page).unwrap(), original);

    let (out, _, ok) = run_docindex(&["guard", &site.to_string_lossy()], home.path());
    assert!(ok, "guard failed: {}", out);
    let guarded = fs::read_to_string(&page).unwrap();
    assert!(guarded.contains("pointer-events: none"));
    assert_eq!(guarded.matches("pointer-events").count(), 1);
    assert!(guarded.contains("<img src=\"_images/logo.png\">"));

    let (out, _, ok) = run_docindex(&["guard", &site.to_string_lossy(), "--check"], home.path());
    assert!(ok, "guarded site should be clean: {}", out);
}

#[test]
fn test_guard_custom_marker() {
    let home = TempDir::new().unwrap();
    let page = create_site(home.path());

    let (_, _, ok) = run_docindex(
        &["guard", &page.to_string_lossy(), "--marker", "frozen"],
        home.path(),
    );
    assert!(ok);
    assert!(!fs::read_to_string(&page).unwrap().contains("pointer-events"));

    let (_, err, ok) = run_docindex(
        &["guard", &page.to_string_lossy(), "--marker", "not a class"],
        home.path(),
    );
    assert!(!ok);
    assert!(!err.is_empty());
}

#[test]
fn test_config_show_uses_defaults() {
    let home = TempDir::new().unwrap();
    let (out, _, ok) = run_docindex(&["config", "show"], home.path());

    assert!(ok);
    assert!(out.contains("\"marker_class\": \"no-click\""));
    assert!(out.contains("\"html_glob\": \"**/*.html\""));
}

#[test]
fn test_explicit_config_file() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("docindex.json");
    fs::write(&config, r#"{"marker_class": "frozen"}"#).unwrap();
    let site = home.path().join("site");
    fs::create_dir_all(&site).unwrap();
    let page = site.join("index.html");
    fs::write(&page, r#"<div class="frozen"><img src="a.png"></div>"#).unwrap();

    let (out, _, ok) = run_docindex(
        &["--config", &config.to_string_lossy(), "guard", &site.to_string_lossy()],
        home.path(),
    );
    assert!(ok, "guard failed: {}", out);
    assert!(fs::read_to_string(&page).unwrap().contains("pointer-events: none"));
}
