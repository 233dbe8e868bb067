use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfSearchError {
    #[error("file operation failed: {0}")]
    FileOperation(String),

    #[error("directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("pdf processing failed for {}: {reason}", path.display())]
    PdfProcessing { path: PathBuf, reason: String },

    #[error("indexing failed: {0}")]
    Indexing(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PdfSearchError {
    pub fn pdf_processing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PdfProcessing {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = PdfSearchError> = std::result::Result<T, E>;
