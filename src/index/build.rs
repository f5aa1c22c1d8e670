use crate::error::{DocIndexError, Result};
use crate::index::types::*;
use crate::index::writer::IndexWriter;
use crate::utils::{TermNormalizer, extract_words};
use anyhow::Context;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Kind of a documented object, e.g. `py:function`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKind {
    pub domain: String,
    pub objtype: String,
    pub label: String,
}

impl ObjectKind {
    pub fn new(domain: &str, objtype: &str) -> Self {
        let domain_label = match domain {
            "py" => "Python",
            "js" => "JavaScript",
            "c" => "C",
            "cpp" => "C++",
            "rst" => "reStructuredText",
            other => other,
        };
        Self {
            domain: domain.to_string(),
            objtype: objtype.to_string(),
            label: format!("{} {}", domain_label, objtype),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// Accumulates documents and produces an immutable [`SearchIndex`].
///
/// Document ids are assigned in insertion order. Body words are resolved in
/// [`IndexBuilder::finish`] so that a word already indexed from a document's
/// titles is not duplicated into that document's body postings.
pub struct IndexBuilder {
    normalizer: TermNormalizer,
    docnames: Vec<String>,
    filenames: Vec<String>,
    titles: Vec<String>,
    doc_ids: FxHashMap<String, DocId>,
    /// Raw body words per document, resolved at finish
    body_words: Vec<FxHashSet<String>>,
    title_mapping: FxHashMap<String, RoaringBitmap>,
    alltitles: BTreeMap<String, Vec<TitleLocation>>,
    indexentries: BTreeMap<String, Vec<IndexEntryLocation>>,
    objects: BTreeMap<String, Vec<ObjectEntry>>,
    objtype_ids: FxHashMap<(String, String), ObjTypeId>,
    objnames: BTreeMap<ObjTypeId, ObjName>,
    objtypes: BTreeMap<ObjTypeId, String>,
    envversion: EnvVersion,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::with_normalizer(TermNormalizer::english())
    }

    pub fn with_normalizer(normalizer: TermNormalizer) -> Self {
        Self {
            normalizer,
            docnames: Vec::new(),
            filenames: Vec::new(),
            titles: Vec::new(),
            doc_ids: FxHashMap::default(),
            body_words: Vec::new(),
            title_mapping: FxHashMap::default(),
            alltitles: BTreeMap::new(),
            indexentries: BTreeMap::new(),
            objects: BTreeMap::new(),
            objtype_ids: FxHashMap::default(),
            objnames: BTreeMap::new(),
            objtypes: BTreeMap::new(),
            envversion: EnvVersion::default(),
        }
    }

    /// Record an extra component version in the environment descriptor
    pub fn env_component(mut self, name: &str, version: u32) -> Self {
        if let EnvVersion::Components(map) = &mut self.envversion {
            map.insert(name.to_string(), version);
        }
        self
    }

    /// Register a page. Its title words are indexed as title terms.
    pub fn add_document(&mut self, docname: &str, filename: &str, title: &str) -> Result<DocId> {
        if self.doc_ids.contains_key(docname) {
            return Err(DocIndexError::Manifest(format!(
                "duplicate document: {}",
                docname
            )));
        }
        let doc_id = self.docnames.len() as DocId;
        self.docnames.push(docname.to_string());
        self.filenames.push(filename.to_string());
        self.titles.push(title.to_string());
        self.doc_ids.insert(docname.to_string(), doc_id);
        self.body_words.push(FxHashSet::default());
        self.add_title_words(doc_id, title);
        Ok(doc_id)
    }

    pub fn doc_id(&self, docname: &str) -> Option<DocId> {
        self.doc_ids.get(docname).copied()
    }

    /// Register a section title. `anchor` is `None` for a title that
    /// addresses the page itself.
    pub fn add_section(&mut self, doc_id: DocId, title: &str, anchor: Option<&str>) -> Result<()> {
        self.check_doc(doc_id)?;
        self.alltitles
            .entry(title.to_string())
            .or_default()
            .push(TitleLocation(doc_id, anchor.map(str::to_string)));
        self.add_title_words(doc_id, title);
        Ok(())
    }

    /// Feed body text of a document
    pub fn add_text(&mut self, doc_id: DocId, text: &str) -> Result<()> {
        self.check_doc(doc_id)?;
        self.body_words[doc_id as usize].extend(extract_words(text));
        Ok(())
    }

    /// Feed already-split body words of a document
    pub fn add_words<I>(&mut self, doc_id: DocId, words: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.check_doc(doc_id)?;
        self.body_words[doc_id as usize].extend(words);
        Ok(())
    }

    /// Register a documented object. Anchors equal to the full name, or to
    /// `<type>-<full name>`, are stored in their compressed forms.
    pub fn add_object(
        &mut self,
        doc_id: DocId,
        prefix: &str,
        name: &str,
        kind: &ObjectKind,
        anchor: &str,
        priority: i32,
    ) -> Result<()> {
        self.check_doc(doc_id)?;
        let objtype = self.objtype_id(kind);
        let fullname = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        let stored_anchor = if anchor == fullname {
            String::new()
        } else if anchor == format!("{}-{}", kind.objtype, fullname) {
            "-".to_string()
        } else {
            anchor.to_string()
        };
        self.objects
            .entry(prefix.to_string())
            .or_default()
            .push(ObjectEntry(doc_id, objtype, priority, stored_anchor, name.to_string()));
        Ok(())
    }

    /// Register a general index entry
    pub fn add_index_entry(&mut self, doc_id: DocId, entry: &str, anchor: &str, main: bool) -> Result<()> {
        self.check_doc(doc_id)?;
        self.indexentries
            .entry(entry.to_string())
            .or_default()
            .push(IndexEntryLocation(doc_id, anchor.to_string(), main));
        Ok(())
    }

    /// Resolve body words and produce the final index
    pub fn finish(self) -> SearchIndex {
        let mut mapping: FxHashMap<String, RoaringBitmap> = FxHashMap::default();
        for (doc_id, words) in self.body_words.iter().enumerate() {
            let doc_id = doc_id as u32;
            for word in words {
                let Some(term) = self.normalizer.term(word) else {
                    continue;
                };
                let in_title = self
                    .title_mapping
                    .get(&term)
                    .is_some_and(|docs| docs.contains(doc_id));
                if !in_title {
                    mapping.entry(term).or_default().insert(doc_id);
                }
            }
        }

        let terms = into_postings(mapping);
        let titleterms = into_postings(self.title_mapping);

        let mut objects = self.objects;
        for rows in objects.values_mut() {
            rows.sort_by(|a, b| a.name().cmp(b.name()));
        }

        debug!(
            documents = self.docnames.len(),
            terms = terms.len(),
            titleterms = titleterms.len(),
            "finished search index"
        );

        SearchIndex {
            alltitles: Some(self.alltitles),
            docnames: self.docnames,
            envversion: self.envversion,
            filenames: self.filenames,
            indexentries: Some(self.indexentries),
            objects,
            objnames: self.objnames,
            objtypes: self.objtypes,
            terms,
            titles: self.titles,
            titleterms,
        }
    }

    fn add_title_words(&mut self, doc_id: DocId, title: &str) {
        for word in extract_words(title) {
            if let Some(term) = self.normalizer.term(&word) {
                self.title_mapping.entry(term).or_default().insert(doc_id);
            }
        }
    }

    fn objtype_id(&mut self, kind: &ObjectKind) -> ObjTypeId {
        let key = (kind.domain.clone(), kind.objtype.clone());
        if let Some(&id) = self.objtype_ids.get(&key) {
            return id;
        }
        let id = self.objtype_ids.len() as ObjTypeId;
        self.objtype_ids.insert(key, id);
        self.objtypes
            .insert(id, format!("{}:{}", kind.domain, kind.objtype));
        self.objnames.insert(
            id,
            ObjName(kind.domain.clone(), kind.objtype.clone(), kind.label.clone()),
        );
        id
    }

    fn check_doc(&self, doc_id: DocId) -> Result<()> {
        if (doc_id as usize) < self.docnames.len() {
            Ok(())
        } else {
            Err(DocIndexError::UnknownDocument(doc_id.to_string()))
        }
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn into_postings(mapping: FxHashMap<String, RoaringBitmap>) -> BTreeMap<String, Postings> {
    mapping
        .into_iter()
        .map(|(term, docs)| (term, Postings::from_sorted(docs.iter().collect())))
        .collect()
}

/// Site description consumed by [`build_from_manifest`]
#[derive(Debug, Clone, Deserialize)]
pub struct SiteManifest {
    pub pages: Vec<PageSpec>,
    /// Extra environment components to record
    #[serde(default)]
    pub envversion: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSpec {
    pub docname: String,
    /// Source filename; defaults to `<docname>.rst`
    #[serde(default)]
    pub filename: Option<String>,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub index_entries: Vec<IndexEntrySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    pub title: String,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_objtype")]
    pub objtype: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Defaults to the full object name
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_domain() -> String {
    "py".to_string()
}

fn default_objtype() -> String {
    "function".to_string()
}

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntrySpec {
    pub entry: String,
    pub anchor: String,
    #[serde(default)]
    pub main: bool,
}

/// Words of one page, split ahead of the sequential builder pass
struct PageWords {
    body: FxHashSet<String>,
}

impl SiteManifest {
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: SiteManifest = serde_json::from_str(text)?;
        if manifest.pages.is_empty() {
            return Err(DocIndexError::Manifest("manifest has no pages".to_string()));
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Build an index from every page in the manifest
    pub fn build(&self, normalizer: TermNormalizer) -> Result<SearchIndex> {
        // Word splitting is independent per page
        let words: Vec<PageWords> = self
            .pages
            .par_iter()
            .map(|page| {
                let mut body = extract_words(&page.text);
                for section in &page.sections {
                    body.extend(extract_words(&section.text));
                }
                PageWords { body }
            })
            .collect();

        let mut builder = IndexBuilder::with_normalizer(normalizer);
        for (name, version) in &self.envversion {
            builder = builder.env_component(name, *version);
        }

        for (page, page_words) in self.pages.iter().zip(words) {
            let filename = page
                .filename
                .clone()
                .unwrap_or_else(|| format!("{}.rst", page.docname));
            let doc_id = builder.add_document(&page.docname, &filename, &page.title)?;

            for section in &page.sections {
                builder.add_section(doc_id, &section.title, section.anchor.as_deref())?;
            }
            builder.add_words(doc_id, page_words.body)?;

            for object in &page.objects {
                let mut kind = ObjectKind::new(&object.domain, &object.objtype);
                if let Some(label) = &object.label {
                    kind = kind.with_label(label);
                }
                let fullname = if object.prefix.is_empty() {
                    object.name.clone()
                } else {
                    format!("{}.{}", object.prefix, object.name)
                };
                let anchor = object.anchor.clone().unwrap_or(fullname);
                builder.add_object(doc_id, &object.prefix, &object.name, &kind, &anchor, object.priority)?;
            }

            for entry in &page.index_entries {
                builder.add_index_entry(doc_id, &entry.entry, &entry.anchor, entry.main)?;
            }
        }

        Ok(builder.finish())
    }
}

/// Build a `searchindex.js` from a manifest file
pub fn build_from_manifest(manifest_path: &Path, output: &Path, stem: bool) -> anyhow::Result<SearchIndex> {
    let manifest = SiteManifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
    info!(pages = manifest.pages.len(), "building search index");

    let index = manifest.build(TermNormalizer::new(stem))?;
    IndexWriter::new(output)
        .write(&index)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(index)
}
