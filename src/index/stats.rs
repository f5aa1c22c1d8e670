use crate::index::reader::IndexReader;
use crate::index::types::{EnvVersion, SearchIndex};
use anyhow::{Context, Result};
use std::path::Path;

/// Summary counts for an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
    pub title_terms: usize,
    pub titles: usize,
    pub objects: usize,
    pub object_types: usize,
    pub index_entries: usize,
    /// Total document references across body postings
    pub postings: usize,
    /// Terms whose postings list is empty
    pub empty_terms: usize,
    pub generator_version: Option<u32>,
}

impl IndexStats {
    pub fn collect(index: &SearchIndex) -> Self {
        Self {
            documents: index.doc_count(),
            terms: index.terms().len(),
            title_terms: index.titleterms().len(),
            titles: index.alltitles().map_or(0, |t| t.len()),
            objects: index.raw_objects().values().map(Vec::len).sum(),
            object_types: index.objtypes().len(),
            index_entries: index.indexentries().map_or(0, |e| e.len()),
            postings: index.terms().values().map(|p| p.len()).sum(),
            empty_terms: index.terms().values().filter(|p| p.is_empty()).count(),
            generator_version: index.envversion().generator(),
        }
    }
}

/// Display index statistics
pub fn show_stats(path: &Path) -> Result<()> {
    let reader = IndexReader::open(path)
        .with_context(|| format!("Failed to open index {}", path.display()))?;
    let index = reader.index();
    let stats = IndexStats::collect(index);

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index file:       {}", path.display());
    println!("Documents:        {}", stats.documents);
    println!("Terms:            {}", stats.terms);
    println!("Title terms:      {}", stats.title_terms);
    println!("Section titles:   {}", stats.titles);
    println!("Objects:          {}", stats.objects);
    println!("Object types:     {}", stats.object_types);
    println!("Index entries:    {}", stats.index_entries);
    println!("Postings:         {}", stats.postings);
    if stats.empty_terms > 0 {
        println!("Empty terms:      {}", stats.empty_terms);
    }

    println!();
    println!("Documents:");
    for doc in index.documents().take(15) {
        println!("  {:4} {:24} {}", doc.id, doc.filename, doc.title);
    }
    if stats.documents > 15 {
        println!("  ... and {} more", stats.documents - 15);
    }

    println!();
    match index.envversion() {
        EnvVersion::Single(v) => println!("Environment:      {}", v),
        EnvVersion::Components(map) => {
            println!("Environment:");
            for (name, version) in map {
                println!("  {:32} {}", name, version);
            }
        }
    }

    Ok(())
}
