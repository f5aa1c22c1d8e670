//! Structural checks for a loaded search index.
//!
//! Validation never stops at the first problem: every violation is collected
//! into a [`ValidationReport`] so a broken generator run can be diagnosed in
//! one pass.

use crate::error::{DocIndexError, Result};
use crate::index::types::*;
use std::collections::BTreeSet;
use std::fmt;

/// Table a dangling reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Terms,
    TitleTerms,
    AllTitles,
    IndexEntries,
    Objects,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Terms => "terms",
            Table::TitleTerms => "titleterms",
            Table::AllTitles => "alltitles",
            Table::IndexEntries => "indexentries",
            Table::Objects => "objects",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The parallel document tables disagree in length
    TableLengthMismatch {
        docnames: usize,
        filenames: usize,
        titles: usize,
    },
    /// A document id that does not exist in the document tables
    DanglingDocument {
        table: Table,
        key: String,
        doc_id: DocId,
    },
    /// An object row points at an object type missing from objtypes/objnames
    UnknownObjectType { name: String, objtype: ObjTypeId },
    /// objtypes and objnames describe the same index differently
    ObjectTypeMismatch {
        objtype: ObjTypeId,
        objtypes: Option<String>,
        objnames: Option<String>,
    },
    /// No usable environment descriptor
    MissingEnvVersion,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TableLengthMismatch {
                docnames,
                filenames,
                titles,
            } => write!(
                f,
                "document tables differ in length: docnames={}, filenames={}, titles={}",
                docnames, filenames, titles
            ),
            Violation::DanglingDocument { table, key, doc_id } => {
                write!(f, "{}[{:?}] references unknown document {}", table, key, doc_id)
            }
            Violation::UnknownObjectType { name, objtype } => {
                write!(f, "object {:?} uses undefined object type {}", name, objtype)
            }
            Violation::ObjectTypeMismatch {
                objtype,
                objtypes,
                objnames,
            } => write!(
                f,
                "object type {} is {} in objtypes but {} in objnames",
                objtype,
                objtypes.as_deref().unwrap_or("missing"),
                objnames.as_deref().unwrap_or("missing"),
            ),
            Violation::MissingEnvVersion => f.write_str("envversion is empty or lacks a generator version"),
        }
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub documents: usize,
    /// Number of document references examined
    pub references_checked: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turn a failed report into an error
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DocIndexError::InvalidIndex {
                count: self.violations.len(),
            })
        }
    }
}

/// Check every structural invariant of the index
pub fn validate(index: &SearchIndex) -> ValidationReport {
    let mut report = ValidationReport {
        documents: index.filenames().len(),
        ..Default::default()
    };

    let (docnames, filenames, titles) = (
        index.docnames().len(),
        index.filenames().len(),
        index.titles().len(),
    );
    if docnames != filenames || filenames != titles {
        report.violations.push(Violation::TableLengthMismatch {
            docnames,
            filenames,
            titles,
        });
    }

    // Ids are checked against the filename list, which is what consumers
    // use to build result links.
    let doc_count = filenames as u64;
    let check = |table: Table, key: &str, doc_id: DocId, report: &mut ValidationReport| {
        report.references_checked += 1;
        if doc_id as u64 >= doc_count {
            report.violations.push(Violation::DanglingDocument {
                table,
                key: key.to_string(),
                doc_id,
            });
        }
    };

    for (table, map) in [
        (Table::Terms, index.terms()),
        (Table::TitleTerms, index.titleterms()),
    ] {
        for (term, postings) in map {
            for &doc_id in postings.doc_ids() {
                check(table, term, doc_id, &mut report);
            }
        }
    }

    if let Some(alltitles) = index.alltitles() {
        for (title, locations) in alltitles {
            for TitleLocation(doc_id, _) in locations {
                check(Table::AllTitles, title, *doc_id, &mut report);
            }
        }
    }

    if let Some(entries) = index.indexentries() {
        for (entry, locations) in entries {
            for IndexEntryLocation(doc_id, _, _) in locations {
                check(Table::IndexEntries, entry, *doc_id, &mut report);
            }
        }
    }

    for (prefix, rows) in index.raw_objects() {
        for row in rows {
            let name = if prefix.is_empty() {
                row.name().to_string()
            } else {
                format!("{}.{}", prefix, row.name())
            };
            check(Table::Objects, &name, row.doc_id(), &mut report);

            let objtype = row.objtype();
            if !index.objtypes().contains_key(&objtype) || !index.objnames().contains_key(&objtype) {
                report
                    .violations
                    .push(Violation::UnknownObjectType { name, objtype });
            }
        }
    }

    let ids: BTreeSet<ObjTypeId> = index
        .objtypes()
        .keys()
        .chain(index.objnames().keys())
        .copied()
        .collect();
    for objtype in ids {
        let declared = index.objtypes().get(&objtype).cloned();
        let described = index.objnames().get(&objtype).map(ObjName::qualified);
        if declared != described {
            report.violations.push(Violation::ObjectTypeMismatch {
                objtype,
                objtypes: declared,
                objnames: described,
            });
        }
    }

    if index.envversion().is_empty() || index.envversion().generator().is_none() {
        report.violations.push(Violation::MissingEnvVersion);
    }

    report
}

/// Difference between the documented symbols and an expected API surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDiff {
    /// Expected names with no object entry
    pub missing: Vec<String>,
    /// Object entries nobody expected
    pub unexpected: Vec<String>,
}

impl ObjectDiff {
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare the set of object names against the expected public entry points
pub fn check_objects<I, S>(index: &SearchIndex, expected: I) -> ObjectDiff
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let expected: BTreeSet<String> = expected
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let actual: BTreeSet<String> = index.objects().into_iter().map(|o| o.name).collect();

    ObjectDiff {
        missing: expected.difference(&actual).cloned().collect(),
        unexpected: actual.difference(&expected).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::parse_index;

    fn index_with(body: &str) -> SearchIndex {
        parse_index(body).unwrap()
    }

    const VALID: &str = r#"{"docnames": ["a", "b"], "envversion": {"sphinx": 61}, "filenames": ["a.rst", "b.rst"], "objects": {"": [[1, 0, 1, "", "kfre_person"]]}, "objnames": {"0": ["py", "function", "Python function"]}, "objtypes": {"0": "py:function"}, "terms": {"risk": [0, 1]}, "titles": ["A", "B"], "titleterms": {"b": 1}}"#;

    #[test]
    fn test_valid_index() {
        let report = validate(&index_with(VALID));
        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.documents, 2);
        assert_eq!(report.references_checked, 4);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_dangling_term_posting() {
        let body = VALID.replace(r#""risk": [0, 1]"#, r#""risk": [0, 7]"#);
        let report = validate(&index_with(&body));
        assert_eq!(
            report.violations,
            vec![Violation::DanglingDocument {
                table: Table::Terms,
                key: "risk".into(),
                doc_id: 7
            }]
        );
        assert!(matches!(
            report.into_result(),
            Err(DocIndexError::InvalidIndex { count: 1 })
        ));
    }

    #[test]
    fn test_collects_all_violations() {
        let body = r#"{"alltitles": {"Gone": [[5, null]]}, "docnames": ["a"], "envversion": {}, "filenames": ["a.rst"], "indexentries": {"x()": [[3, "x", false]]}, "objects": {"": [[9, 2, 1, "", "x"]]}, "objnames": {}, "objtypes": {}, "terms": {}, "titles": [], "titleterms": {"t": 4}}"#;
        let report = validate(&index_with(body));
        let v = &report.violations;
        assert!(v.iter().any(|v| matches!(v, Violation::TableLengthMismatch { titles: 0, .. })));
        assert!(v.iter().any(|v| matches!(v, Violation::DanglingDocument { table: Table::AllTitles, .. })));
        assert!(v.iter().any(|v| matches!(v, Violation::DanglingDocument { table: Table::IndexEntries, .. })));
        assert!(v.iter().any(|v| matches!(v, Violation::DanglingDocument { table: Table::TitleTerms, .. })));
        assert!(v.iter().any(|v| matches!(v, Violation::DanglingDocument { table: Table::Objects, .. })));
        assert!(v.iter().any(|v| matches!(v, Violation::UnknownObjectType { objtype: 2, .. })));
        assert!(v.contains(&Violation::MissingEnvVersion));
    }

    #[test]
    fn test_objtype_tables_disagree() {
        let body = VALID.replace(r#""objtypes": {"0": "py:function"}"#, r#""objtypes": {"0": "py:class"}"#);
        let report = validate(&index_with(&body));
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].to_string().contains("py:class"));
    }

    #[test]
    fn test_check_objects() {
        let index = index_with(VALID);
        assert!(check_objects(&index, ["kfre_person"]).is_exact());

        let diff = check_objects(&index, ["kfre_person", "upcr_uacr"]);
        assert_eq!(diff.missing, vec!["upcr_uacr"]);
        assert!(diff.unexpected.is_empty());

        let diff = check_objects(&index, Vec::<String>::new());
        assert_eq!(diff.unexpected, vec!["kfre_person"]);
    }
}
