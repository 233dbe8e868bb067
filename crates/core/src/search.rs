use crate::config::SearchConfig;
use crate::error::{PdfSearchError, Result};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::indexer::{Indexer, IndexingReport};
use crate::models::{DocumentIndex, SearchResult};
use crate::normalizer::{jaccard, TextNormalizer};
use crate::store::DocumentStore;
use crate::tasks::{BackgroundTask, TaskProgress};
use crate::validator::FileValidator;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// A document is a hit only when the query text occurs in it literally.
    #[default]
    Occurrence,
    /// A document is a hit when its token overlap reaches `min_score`.
    Similarity,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Occurrence => "occurrence",
            Self::Similarity => "similarity",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = PdfSearchError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "occurrence" | "exact" => Ok(Self::Occurrence),
            "similarity" | "fuzzy" => Ok(Self::Similarity),
            other => Err(PdfSearchError::Search(format!("unknown search mode: {other}"))),
        }
    }
}

/// Owns the document store and answers queries against it. Updates are built
/// off to the side and installed whole, so a snapshot taken before an update
/// never observes a partially indexed state.
pub struct SearchEngine {
    config: SearchConfig,
    indexer: Indexer,
    store: Arc<DocumentStore>,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::with_extractor(config, Arc::new(LopdfExtractor))
    }

    pub fn with_extractor(config: SearchConfig, extractor: Arc<dyn PdfExtractor>) -> Result<Self> {
        config.validate()?;
        let normalizer = Arc::new(TextNormalizer::from_config(&config)?);
        let indexer = Indexer::new(
            normalizer,
            extractor,
            Arc::new(FileValidator::new()),
            config.index_batch_size,
        );
        Ok(Self {
            config,
            indexer,
            store: Arc::new(DocumentStore::new()),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        self.indexer.normalizer()
    }

    pub fn validator(&self) -> &FileValidator {
        self.indexer.validator()
    }

    pub fn indexer(&self) -> Indexer {
        self.indexer.clone()
    }

    pub fn snapshot(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.store)
    }

    pub fn install(&mut self, store: impl Into<Arc<DocumentStore>>) {
        self.store = store.into();
        debug!(documents = self.store.len(), "installed document store");
    }

    /// Replaces any existing entry for `path`.
    pub fn index_document(&mut self, path: &str, text: &str, title: &str, page_count: u32) {
        let document = self.indexer.build_document(path, text, title, page_count);
        Arc::make_mut(&mut self.store).insert(document);
    }

    pub fn index_directory(&mut self, directory: &Path) -> Result<IndexingReport> {
        let report = self
            .indexer
            .index_directory(directory, &self.store, &TaskProgress::default())?;
        self.install(Arc::clone(&report.store));
        Ok(report)
    }

    /// Indexes on the blocking pool against the current snapshot. The caller
    /// installs `report.store` once the task completes.
    pub fn spawn_indexing(&self, directory: PathBuf) -> BackgroundTask<IndexingReport> {
        let indexer = self.indexer();
        let base = self.snapshot();
        BackgroundTask::spawn(format!("index {}", directory.display()), move |progress| {
            indexer.index_directory(&directory, &base, progress)
        })
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn clear_index(&mut self) {
        self.store = Arc::new(DocumentStore::new());
        info!("index cleared");
    }

    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_with_mode(query, SearchMode::Occurrence)
    }

    /// Results are ordered by score, highest first; equal scores keep store
    /// order. The result count is not capped here.
    pub fn search_with_mode(&self, query: &str, mode: SearchMode) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            debug!("empty query");
            return Vec::new();
        }

        let query_terms = self.normalizer().term_set(query);
        let mut results = self
            .store
            .iter()
            .filter_map(|document| self.score_document(document, query, &query_terms, mode))
            .collect::<Vec<_>>();

        results.sort_by(|left, right| right.score.total_cmp(&left.score));
        debug!(query, mode = %mode, hits = results.len(), "search finished");
        results
    }

    fn score_document(
        &self,
        document: &DocumentIndex,
        query: &str,
        query_terms: &BTreeSet<String>,
        mode: SearchMode,
    ) -> Option<SearchResult> {
        let score = jaccard(query_terms, &document.processed_doc.unique_terms);
        let occurrences = find_occurrences(&document.content, query);

        let keep = match mode {
            SearchMode::Occurrence => !occurrences.is_empty(),
            SearchMode::Similarity => score > 0.0 && score >= self.config.min_score,
        };
        if !keep {
            return None;
        }

        let matches = occurrences
            .into_iter()
            .map(|range| context_snippet(&document.content, range, self.config.context_size))
            .collect();

        Some(SearchResult {
            file_path: document.file_path.clone(),
            title: document.title.clone(),
            score,
            matches,
        })
    }

    pub fn idf(&self, term: &str) -> f64 {
        inverse_document_frequency(self.store.documents_containing(term), self.store.len())
    }
}

/// Byte ranges of `phrase` in `text`, overlapping occurrences included.
/// Case-sensitive first; case-insensitive only when that finds nothing.
pub fn find_occurrences(text: &str, phrase: &str) -> Vec<Range<usize>> {
    if phrase.is_empty() {
        return Vec::new();
    }

    let exact = scan_occurrences(text, phrase);
    if !exact.is_empty() {
        return exact;
    }

    let (lowered, offsets) = lowercase_with_offsets(text);
    scan_occurrences(&lowered, &phrase.to_lowercase())
        .into_iter()
        .map(|range| offsets[range.start]..offsets[range.end])
        .filter(|range| range.start < range.end)
        .collect()
}

fn scan_occurrences(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        found.push(start..start + needle.len());
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    found
}

/// Lower-cases `text` and records, for every byte of the result, the byte
/// offset of the source character it came from (plus one trailing entry).
fn lowercase_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut lowered = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len() + 1);
    for (index, ch) in text.char_indices() {
        for lower in ch.to_lowercase() {
            let before = lowered.len();
            lowered.push(lower);
            offsets.extend(std::iter::repeat(index).take(lowered.len() - before));
        }
    }
    offsets.push(text.len());
    (lowered, offsets)
}

/// `range` plus up to `context_size` characters each side, trimmed; `...`
/// marks a side that was cut short of the text boundary.
pub fn context_snippet(text: &str, range: Range<usize>, context_size: usize) -> String {
    let start = if context_size == 0 {
        range.start
    } else {
        text[..range.start]
            .char_indices()
            .rev()
            .take(context_size)
            .last()
            .map_or(range.start, |(index, _)| index)
    };
    let after = &text[range.end..];
    let end = range.end
        + after
            .char_indices()
            .nth(context_size)
            .map_or(after.len(), |(index, _)| index);

    let mut snippet = text.get(start..end).unwrap_or_default().trim().to_string();
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

/// `ln((total + 1) / (containing + 1)) + 1`, or 0.0 when either count is zero.
pub fn inverse_document_frequency(docs_containing: usize, total_docs: usize) -> f64 {
    if docs_containing == 0 || total_docs == 0 {
        return 0.0;
    }
    ((total_docs as f64 + 1.0) / (docs_containing as f64 + 1.0)).ln() + 1.0
}
