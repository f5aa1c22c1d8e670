use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a document in the parallel `docnames`/`filenames`/`titles` tables
pub type DocId = u32;

/// Key into the `objtypes` and `objnames` tables
pub type ObjTypeId = u32;

/// Environment version of the generator whose index format this crate mirrors
pub const FORMAT_ENV_VERSION: u32 = 61;

/// Postings for a single term.
///
/// The generator writes a term found in exactly one document as a bare id
/// and everything else as a sorted list, which may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Postings {
    One(DocId),
    Many(Vec<DocId>),
}

impl Postings {
    /// Build postings from sorted, deduplicated document ids
    pub fn from_sorted(mut ids: Vec<DocId>) -> Self {
        if ids.len() == 1 {
            Postings::One(ids.remove(0))
        } else {
            Postings::Many(ids)
        }
    }

    pub fn doc_ids(&self) -> &[DocId] {
        match self {
            Postings::One(id) => std::slice::from_ref(id),
            Postings::Many(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids().is_empty()
    }
}

/// Where a section title lives: document plus anchor, `None` for the page itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleLocation(pub DocId, pub Option<String>);

/// General index entry target: document, anchor, and whether it is the main entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntryLocation(pub DocId, pub String, pub bool);

/// Raw object row: `[doc, objtype, priority, anchor, name]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry(
    pub DocId,
    pub ObjTypeId,
    pub i32,
    pub String,
    pub String,
);

impl ObjectEntry {
    pub fn doc_id(&self) -> DocId {
        self.0
    }

    pub fn objtype(&self) -> ObjTypeId {
        self.1
    }

    pub fn priority(&self) -> i32 {
        self.2
    }

    pub fn raw_anchor(&self) -> &str {
        &self.3
    }

    pub fn name(&self) -> &str {
        &self.4
    }
}

/// Object type description: `[domain, type, human readable label]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjName(pub String, pub String, pub String);

impl ObjName {
    pub fn domain(&self) -> &str {
        &self.0
    }

    pub fn objtype(&self) -> &str {
        &self.1
    }

    pub fn label(&self) -> &str {
        &self.2
    }

    /// `domain:type` form used by the `objtypes` table
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

/// Environment descriptor. Old generators wrote a single integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvVersion {
    Single(u32),
    Components(BTreeMap<String, u32>),
}

impl EnvVersion {
    /// Version of the generator core, if recorded
    pub fn generator(&self) -> Option<u32> {
        match self {
            EnvVersion::Single(v) => Some(*v),
            EnvVersion::Components(map) => map.get("sphinx").copied(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, EnvVersion::Components(map) if map.is_empty())
    }
}

impl Default for EnvVersion {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert("sphinx".to_string(), FORMAT_ENV_VERSION);
        EnvVersion::Components(map)
    }
}

/// A complete documentation search index.
///
/// Fields are declared in key order so serialization matches the generator's
/// sorted output. The type has no mutating API: a changed site produces a new
/// index through [`crate::index::IndexBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) alltitles: Option<BTreeMap<String, Vec<TitleLocation>>>,
    pub(crate) docnames: Vec<String>,
    pub(crate) envversion: EnvVersion,
    pub(crate) filenames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) indexentries: Option<BTreeMap<String, Vec<IndexEntryLocation>>>,
    pub(crate) objects: BTreeMap<String, Vec<ObjectEntry>>,
    pub(crate) objnames: BTreeMap<ObjTypeId, ObjName>,
    pub(crate) objtypes: BTreeMap<ObjTypeId, String>,
    pub(crate) terms: BTreeMap<String, Postings>,
    pub(crate) titles: Vec<String>,
    pub(crate) titleterms: BTreeMap<String, Postings>,
}

/// Document record joined across the parallel tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRecord<'a> {
    pub id: DocId,
    pub docname: &'a str,
    pub filename: &'a str,
    pub title: &'a str,
}

/// Cross-referenceable symbol with its anchor and kind resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord<'a> {
    pub name: String,
    pub doc_id: DocId,
    pub anchor: String,
    pub kind: Option<&'a str>,
    pub label: Option<&'a str>,
    pub priority: i32,
}

impl SearchIndex {
    pub fn docnames(&self) -> &[String] {
        &self.docnames
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn envversion(&self) -> &EnvVersion {
        &self.envversion
    }

    pub fn terms(&self) -> &BTreeMap<String, Postings> {
        &self.terms
    }

    pub fn titleterms(&self) -> &BTreeMap<String, Postings> {
        &self.titleterms
    }

    pub fn alltitles(&self) -> Option<&BTreeMap<String, Vec<TitleLocation>>> {
        self.alltitles.as_ref()
    }

    pub fn indexentries(&self) -> Option<&BTreeMap<String, Vec<IndexEntryLocation>>> {
        self.indexentries.as_ref()
    }

    pub fn raw_objects(&self) -> &BTreeMap<String, Vec<ObjectEntry>> {
        &self.objects
    }

    pub fn objnames(&self) -> &BTreeMap<ObjTypeId, ObjName> {
        &self.objnames
    }

    pub fn objtypes(&self) -> &BTreeMap<ObjTypeId, String> {
        &self.objtypes
    }

    /// Number of documents, as defined by the docnames table
    pub fn doc_count(&self) -> usize {
        self.docnames.len()
    }

    /// Join a document id across the docnames/filenames/titles tables
    pub fn document(&self, id: DocId) -> Option<DocumentRecord<'_>> {
        let idx = id as usize;
        Some(DocumentRecord {
            id,
            docname: self.docnames.get(idx)?,
            filename: self.filenames.get(idx)?,
            title: self.titles.get(idx)?,
        })
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentRecord<'_>> {
        (0..self.doc_count() as DocId).filter_map(|id| self.document(id))
    }

    /// Flatten the object table, resolving anchors and kinds.
    ///
    /// An empty stored anchor means the anchor is the full name; `-` means
    /// `<type>-<full name>`.
    pub fn objects(&self) -> Vec<ObjectRecord<'_>> {
        let mut records = Vec::new();
        for (prefix, entries) in &self.objects {
            for entry in entries {
                let name = if prefix.is_empty() {
                    entry.name().to_string()
                } else {
                    format!("{}.{}", prefix, entry.name())
                };
                let objname = self.objnames.get(&entry.objtype());
                let anchor = match entry.raw_anchor() {
                    "" => name.clone(),
                    "-" => match objname {
                        Some(n) => format!("{}-{}", n.objtype(), name),
                        None => name.clone(),
                    },
                    other => other.to_string(),
                };
                records.push(ObjectRecord {
                    anchor,
                    doc_id: entry.doc_id(),
                    kind: self.objtypes.get(&entry.objtype()).map(String::as_str),
                    label: objname.map(ObjName::label),
                    priority: entry.priority(),
                    name,
                });
            }
        }
        records
    }

    /// Find an object by its full (prefixed) name
    pub fn object(&self, name: &str) -> Option<ObjectRecord<'_>> {
        self.objects().into_iter().find(|o| o.name == name)
    }
}
