use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const INDEX_FORMAT_VERSION: &str = "1.0";

/// Scan-time state of a single candidate file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    pub is_valid: bool,
    pub error_message: Option<String>,
}

impl FileRecord {
    pub fn invalid(mut self, reason: impl Into<String>) -> Self {
        self.is_valid = false;
        self.error_message = Some(reason.into());
        self
    }
}

/// Normalized view of a text. `unique_terms` is always the distinct set of
/// `tokens` and the frequencies always sum to `tokens.len()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProcessedDocument {
    pub original_text: String,
    pub tokens: Vec<String>,
    pub term_frequencies: BTreeMap<String, usize>,
    pub unique_terms: BTreeSet<String>,
}

impl ProcessedDocument {
    pub fn from_tokens(original_text: impl Into<String>, tokens: Vec<String>) -> Self {
        let mut term_frequencies = BTreeMap::new();
        for token in &tokens {
            *term_frequencies.entry(token.clone()).or_insert(0) += 1;
        }
        let unique_terms = term_frequencies.keys().cloned().collect();

        Self {
            original_text: original_text.into(),
            tokens,
            term_frequencies,
            unique_terms,
        }
    }

    pub fn frequency(&self, term: &str) -> usize {
        self.term_frequencies.get(term).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentIndex {
    pub file_path: String,
    pub title: String,
    pub page_count: u32,
    pub content: String,
    pub processed_doc: ProcessedDocument,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub file_path: String,
    pub title: String,
    pub score: f64,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMetadata {
    pub version: String,
    pub document_count: usize,
    pub last_updated: DateTime<Utc>,
    pub document_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl IndexMetadata {
    pub fn is_supported(&self) -> bool {
        self.version == INDEX_FORMAT_VERSION
    }
}

/// Document information dictionary contents as reported by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creation_date: Option<NaiveDateTime>,
    pub modification_date: Option<NaiveDateTime>,
    pub page_count: u32,
}
