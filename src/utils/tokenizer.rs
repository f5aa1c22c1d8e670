use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

/// Words the index generator never stores for English pages
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "near", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Split text into raw words (runs of Unicode word characters)
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    WORD_RE.find_iter(text).map(|m| m.as_str())
}

/// Collect the distinct raw words of a text
pub fn extract_words(text: &str) -> FxHashSet<String> {
    split_words(text).map(str::to_string).collect()
}

/// Turns raw words into index terms: lowercase, stem, stop-word filter
pub struct TermNormalizer {
    stemmer: Option<Stemmer>,
    stopwords: FxHashSet<&'static str>,
}

impl TermNormalizer {
    pub fn english() -> Self {
        Self::new(true)
    }

    pub fn new(stem: bool) -> Self {
        Self {
            stemmer: stem.then(|| Stemmer::create(Algorithm::English)),
            stopwords: ENGLISH_STOPWORDS.iter().copied().collect(),
        }
    }

    /// Lowercase and stem a single word
    pub fn stem(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        match &self.stemmer {
            Some(stemmer) => stemmer.stem(&lower).into_owned(),
            None => lower,
        }
    }

    /// Whether a term may be stored in the index.
    ///
    /// Rejects stop words and one- or two-character hiragana words.
    pub fn accepts(&self, word: &str) -> bool {
        let Some(first) = word.chars().next() else {
            return true;
        };
        let code = first as u32;
        let short_hiragana = word.chars().count() < 3 && code > 12353 && code < 12436;
        let stopword = code < 256 && self.stopwords.contains(word);
        !(short_hiragana || stopword)
    }

    /// Index term for a word, falling back to the word exactly as written
    /// when the stem itself would be filtered out. A capitalized stop word
    /// such as `The` is therefore kept as is.
    pub fn term(&self, word: &str) -> Option<String> {
        let stemmed = self.stem(word);
        if self.accepts(&stemmed) {
            return Some(stemmed);
        }
        self.accepts(word).then(|| word.to_string())
    }

    /// Candidate terms to probe when looking a word up: the stem, then the
    /// word as written, then its lowercase form
    pub fn lookup_candidates(&self, word: &str) -> Vec<String> {
        let mut candidates = vec![self.stem(word)];
        for form in [word.to_string(), word.to_lowercase()] {
            if !candidates.contains(&form) {
                candidates.push(form);
            }
        }
        candidates
    }
}

impl Default for TermNormalizer {
    fn default() -> Self {
        Self::english()
    }
}
