use crate::error::{PdfSearchError, Result};
use crate::stopwords::Language;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const INDEX_DIR_ENV: &str = "PDF_INDEX_DIR";
const APP_DIR_NAME: &str = "pdf_search";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub min_score: f64,
    pub context_size: usize,
    pub index_batch_size: usize,
    pub language: String,
    pub use_stop_words: bool,
    pub index_directory: Option<PathBuf>,
    pub last_directory: Option<PathBuf>,
    pub auto_index: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            min_score: 0.1,
            context_size: 50,
            index_batch_size: 100,
            language: Language::default().name().to_string(),
            use_stop_words: true,
            index_directory: None,
            last_directory: None,
            auto_index: true,
        }
    }
}

impl SearchConfig {
    /// Missing file yields defaults; malformed or invalid contents are an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|error| {
            PdfSearchError::FileOperation(format!(
                "cannot read config {}: {error}",
                path.display()
            ))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|error| {
            PdfSearchError::Configuration(format!("malformed config {}: {error}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "falling back to default config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(PdfSearchError::Configuration(
                "max_results must be greater than zero".to_string(),
            ));
        }
        if self.index_batch_size == 0 {
            return Err(PdfSearchError::Configuration(
                "index_batch_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(PdfSearchError::Configuration(format!(
                "min_score must be within 0.0..=1.0, got {}",
                self.min_score
            )));
        }
        self.language()?;
        Ok(())
    }

    pub fn language(&self) -> Result<Language> {
        self.language.parse()
    }

    /// Explicit setting, then `PDF_INDEX_DIR`, then the per-user data directory.
    pub fn resolve_index_directory(&self) -> PathBuf {
        if let Some(dir) = &self.index_directory {
            return dir.clone();
        }
        if let Ok(value) = std::env::var(INDEX_DIR_ENV) {
            let value = value.trim();
            if !value.is_empty() {
                return PathBuf::from(value);
            }
        }
        default_index_directory()
    }

    pub fn remember_last_directory(&mut self, directory: &Path) {
        self.last_directory = Some(directory.to_path_buf());
    }
}

pub fn default_index_directory() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data) => data.join(APP_DIR_NAME).join("index"),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pdf_search")
            .join("index"),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("config.json")
}
