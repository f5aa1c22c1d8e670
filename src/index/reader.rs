use crate::error::{DocIndexError, Result};
use crate::index::types::*;
use crate::utils::TermNormalizer;
use memchr::{memmem, memrchr};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Call wrapping the serialized index in a generated `searchindex.js`
pub const WRAPPER_PREFIX: &str = "Search.setIndex(";
pub const WRAPPER_SUFFIX: &str = ")";

/// Parse index text, accepting either the `Search.setIndex(...)` wrapper or
/// bare JSON
pub fn parse_index(text: &str) -> Result<SearchIndex> {
    let body = strip_wrapper(text)?;
    Ok(serde_json::from_str(body)?)
}

/// Locate the JSON payload inside the wrapper call
fn strip_wrapper(text: &str) -> Result<&str> {
    let bytes = text.as_bytes();
    let Some(start) = memmem::find(bytes, WRAPPER_PREFIX.as_bytes()) else {
        return Ok(text.trim());
    };
    let body_start = start + WRAPPER_PREFIX.len();

    // Closing paren is the last one in the file; a trailing `;` is allowed
    let end = memrchr(b')', &bytes[body_start..])
        .map(|pos| body_start + pos)
        .ok_or(DocIndexError::UnterminatedWrapper {
            prefix: WRAPPER_PREFIX,
        })?;
    let tail = text[end + 1..].trim();
    if !(tail.is_empty() || tail == ";") {
        return Err(DocIndexError::UnterminatedWrapper {
            prefix: WRAPPER_PREFIX,
        });
    }

    Ok(&text[body_start..end])
}

/// Resolved postings for one looked-up word
#[derive(Debug, Clone)]
pub struct TermMatch<'a> {
    pub word: String,
    /// Term key that matched in the body postings, if any
    pub term: Option<String>,
    pub documents: Vec<DocumentRecord<'a>>,
    /// Term key that matched in the title postings, if any
    pub title_term: Option<String>,
    pub title_documents: Vec<DocumentRecord<'a>>,
}

impl TermMatch<'_> {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.title_documents.is_empty()
    }
}

/// Read-only view over a loaded search index
pub struct IndexReader {
    index: SearchIndex,
    path: Option<PathBuf>,
    normalizer: TermNormalizer,
}

impl IndexReader {
    /// Open a `searchindex.js` (or bare JSON) file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let index = parse_index(&text)?;
        debug!(
            path = %path.display(),
            documents = index.doc_count(),
            terms = index.terms().len(),
            "opened search index"
        );
        Ok(Self {
            index,
            path: Some(path.to_path_buf()),
            normalizer: TermNormalizer::english(),
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::from_index(parse_index(text)?))
    }

    pub fn from_index(index: SearchIndex) -> Self {
        Self {
            index,
            path: None,
            normalizer: TermNormalizer::english(),
        }
    }

    /// Use a different word normalizer for lookups (e.g. unstemmed indexes)
    pub fn with_normalizer(mut self, normalizer: TermNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn into_index(self) -> SearchIndex {
        self.index
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self, id: DocId) -> Option<DocumentRecord<'_>> {
        self.index.document(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentRecord<'_>> {
        self.index.documents()
    }

    /// Find a document by its docname
    pub fn document_by_name(&self, docname: &str) -> Option<DocumentRecord<'_>> {
        let pos = self.index.docnames().iter().position(|d| d == docname)?;
        self.index.document(pos as DocId)
    }

    /// Body postings for a word, normalized the way the builder stores terms
    pub fn postings(&self, word: &str) -> Option<&Postings> {
        self.probe(self.index.terms(), word).map(|(_, p)| p)
    }

    /// Title postings for a word
    pub fn title_postings(&self, word: &str) -> Option<&Postings> {
        self.probe(self.index.titleterms(), word).map(|(_, p)| p)
    }

    /// Locations of an exact section title
    pub fn title_locations(&self, title: &str) -> Vec<(DocumentRecord<'_>, Option<&str>)> {
        self.index
            .alltitles()
            .and_then(|titles| titles.get(title))
            .map(|locations| {
                locations
                    .iter()
                    .filter_map(|TitleLocation(doc, anchor)| {
                        Some((self.index.document(*doc)?, anchor.as_deref()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a word against both body and title postings
    pub fn lookup(&self, word: &str) -> TermMatch<'_> {
        let body = self.probe(self.index.terms(), word);
        let title = self.probe(self.index.titleterms(), word);
        TermMatch {
            word: word.to_string(),
            term: body.map(|(k, _)| k.to_string()),
            documents: body.map(|(_, p)| self.resolve(p)).unwrap_or_default(),
            title_term: title.map(|(k, _)| k.to_string()),
            title_documents: title.map(|(_, p)| self.resolve(p)).unwrap_or_default(),
        }
    }

    pub fn objects(&self) -> Vec<ObjectRecord<'_>> {
        self.index.objects()
    }

    pub fn object(&self, name: &str) -> Option<ObjectRecord<'_>> {
        self.index.object(name)
    }

    fn probe<'m>(
        &self,
        map: &'m std::collections::BTreeMap<String, Postings>,
        word: &str,
    ) -> Option<(&'m str, &'m Postings)> {
        self.normalizer
            .lookup_candidates(word)
            .into_iter()
            .find_map(|candidate| map.get_key_value(candidate.as_str()))
            .map(|(k, v)| (k.as_str(), v))
    }

    fn resolve(&self, postings: &Postings) -> Vec<DocumentRecord<'_>> {
        postings
            .doc_ids()
            .iter()
            .filter_map(|id| self.index.document(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"Search.setIndex({"alltitles": {"Installation": [[0, "installation"]], "Usage": [[1, null]]}, "docnames": ["install", "usage"], "envversion": {"sphinx": 61}, "filenames": ["install.rst", "usage.rst"], "objects": {}, "objnames": {}, "objtypes": {}, "terms": {"instal": 0, "patient": [0, 1], "risk": 1}, "titles": ["Installation", "Usage"], "titleterms": {"instal": 0, "usag": 1}})"#;

    #[test]
    fn test_strip_wrapper() {
        assert_eq!(strip_wrapper("Search.setIndex({})").unwrap(), "{}");
        assert_eq!(strip_wrapper("  Search.setIndex({});\n").unwrap(), "{}");
        assert_eq!(strip_wrapper(" {\"a\": 1} ").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_wrapper() {
        let err = strip_wrapper("Search.setIndex({}").unwrap_err();
        assert!(matches!(err, DocIndexError::UnterminatedWrapper { .. }));

        let err = strip_wrapper("Search.setIndex({}) trailing").unwrap_err();
        assert!(matches!(err, DocIndexError::UnterminatedWrapper { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_index("Search.setIndex({\"docnames\": [)").unwrap_err();
        assert!(matches!(err, DocIndexError::Json(_)));
    }

    #[test]
    fn test_lookup_stems_query_word() {
        let reader = IndexReader::parse(SMALL).unwrap();
        let hit = reader.lookup("Patients");
        assert_eq!(hit.term.as_deref(), Some("patient"));
        let names: Vec<_> = hit.documents.iter().map(|d| d.docname).collect();
        assert_eq!(names, vec!["install", "usage"]);
        assert!(hit.title_documents.is_empty());
    }

    #[test]
    fn test_lookup_title_terms() {
        let reader = IndexReader::parse(SMALL).unwrap();
        let hit = reader.lookup("installing");
        assert_eq!(hit.title_term.as_deref(), Some("instal"));
        assert_eq!(hit.title_documents[0].filename, "install.rst");
    }

    #[test]
    fn test_lookup_miss() {
        let reader = IndexReader::parse(SMALL).unwrap();
        assert!(reader.lookup("dialysis").is_empty());
        assert!(reader.postings("dialysis").is_none());
    }

    #[test]
    fn test_title_locations() {
        let reader = IndexReader::parse(SMALL).unwrap();
        let locs = reader.title_locations("Usage");
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].0.docname, "usage");
        assert_eq!(locs[0].1, None);
        assert!(reader.title_locations("Missing").is_empty());
    }

    #[test]
    fn test_document_by_name() {
        let reader = IndexReader::parse(SMALL).unwrap();
        assert_eq!(reader.document_by_name("usage").unwrap().id, 1);
        assert!(reader.document_by_name("nope").is_none());
    }
}
