pub mod config;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod inspector;
pub mod lemmatizer;
pub mod models;
pub mod normalizer;
pub mod search;
pub mod stopwords;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod validator;

pub use config::{default_config_path, default_index_directory, SearchConfig, INDEX_DIR_ENV};
pub use error::{PdfSearchError, Result};
pub use extractor::{decode_pdf_string, parse_pdf_date, ExtractedPdf, LopdfExtractor, PdfExtractor};
pub use indexer::{Indexer, IndexingReport, SkippedPdf};
pub use inspector::{ContentInspector, SignatureInspector, PDF_MIME};
pub use lemmatizer::{lemmatizer_for, EnglishLemmatizer, Lemmatizer};
pub use models::{
    DocumentIndex, FileRecord, IndexMetadata, PdfMetadata, ProcessedDocument, SearchResult,
    INDEX_FORMAT_VERSION,
};
pub use normalizer::{jaccard, normalize_whitespace, TextNormalizer};
pub use search::{
    context_snippet, find_occurrences, inverse_document_frequency, SearchEngine, SearchMode,
};
pub use stopwords::{Language, StopWords, DOMAIN_STOP_WORDS};
pub use storage::{IndexStorage, DATA_FILE_NAME, METADATA_FILE_NAME};
pub use store::DocumentStore;
pub use tasks::{run_in_background, BackgroundTask, ProgressSnapshot, TaskProgress};
pub use validator::{discover_pdf_files, is_pdf_candidate, FileValidator, ScanFailure, ScanReport};
