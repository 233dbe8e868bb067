//! On-disk index: a zlib-compressed bincode payload plus a JSON metadata file
//! that is checked before the payload is touched. Failures are logged and
//! reported as `false`/`None`; a damaged index reads as no index.

use crate::config::SearchConfig;
use crate::error::{PdfSearchError, Result};
use crate::models::{IndexMetadata, INDEX_FORMAT_VERSION};
use crate::store::DocumentStore;
use chrono::Utc;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const DATA_FILE_NAME: &str = "search_index.bin";
pub const METADATA_FILE_NAME: &str = "metadata.json";

#[derive(Debug, Clone)]
pub struct IndexStorage {
    index_dir: PathBuf,
    data_path: PathBuf,
    metadata_path: PathBuf,
}

impl IndexStorage {
    /// Creates `index_dir` if needed.
    pub fn new(index_dir: impl Into<PathBuf>) -> Result<Self> {
        let index_dir = index_dir.into();
        fs::create_dir_all(&index_dir).map_err(|error| {
            PdfSearchError::FileOperation(format!(
                "cannot create index directory {}: {error}",
                index_dir.display()
            ))
        })?;
        Ok(Self {
            data_path: index_dir.join(DATA_FILE_NAME),
            metadata_path: index_dir.join(METADATA_FILE_NAME),
            index_dir,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(config.resolve_index_directory())
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn save(&self, store: &DocumentStore) -> bool {
        match self.write_index(store) {
            Ok(metadata) => {
                info!(
                    documents = metadata.document_count,
                    dir = %self.index_dir.display(),
                    "index saved"
                );
                true
            }
            Err(error) => {
                error!(dir = %self.index_dir.display(), reason = %error, "failed to save index");
                false
            }
        }
    }

    fn write_index(&self, store: &DocumentStore) -> Result<IndexMetadata> {
        let payload = encode(store)?;
        let metadata = IndexMetadata {
            version: INDEX_FORMAT_VERSION.to_string(),
            document_count: store.len(),
            last_updated: Utc::now(),
            document_paths: store.paths(),
            checksum: Some(checksum(&payload)),
        };

        write_atomically(&self.data_path, &payload)?;
        write_atomically(&self.metadata_path, &serde_json::to_vec_pretty(&metadata)?)?;
        Ok(metadata)
    }

    pub fn load(&self) -> Option<DocumentStore> {
        if !self.data_path.is_file() || !self.metadata_path.is_file() {
            debug!(dir = %self.index_dir.display(), "no index on disk");
            return None;
        }

        match self.read_index() {
            Ok(store) => {
                info!(documents = store.len(), "index loaded");
                Some(store)
            }
            Err(error) => {
                warn!(dir = %self.index_dir.display(), reason = %error, "ignoring unreadable index");
                None
            }
        }
    }

    fn read_index(&self) -> Result<DocumentStore> {
        let metadata = self.read_metadata()?;
        if !metadata.is_supported() {
            return Err(PdfSearchError::Indexing(format!(
                "unsupported index version {} (expected {INDEX_FORMAT_VERSION})",
                metadata.version
            )));
        }

        let payload = fs::read(&self.data_path)?;
        if let Some(expected) = &metadata.checksum {
            if checksum(&payload) != *expected {
                return Err(PdfSearchError::Indexing("index checksum mismatch".to_string()));
            }
        }
        let store = decode(&payload)?;

        for path in &metadata.document_paths {
            if !Path::new(path).exists() {
                warn!(path = %path, "indexed file no longer exists");
            }
        }
        Ok(store)
    }

    fn read_metadata(&self) -> Result<IndexMetadata> {
        let raw = fs::read(&self.metadata_path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Merges `documents` over whatever is on disk; same-path entries are replaced.
    pub fn update(&self, documents: DocumentStore) -> bool {
        let mut merged = self.load().unwrap_or_default();
        merged.merge(documents);
        self.save(&merged)
    }

    pub fn info(&self) -> Option<IndexMetadata> {
        if !self.metadata_path.is_file() {
            return None;
        }
        match self.read_metadata() {
            Ok(metadata) => Some(metadata),
            Err(error) => {
                warn!(path = %self.metadata_path.display(), reason = %error, "unreadable index metadata");
                None
            }
        }
    }

    /// Already-absent files count as cleared.
    pub fn clear(&self) -> bool {
        let mut cleared = true;
        for path in [&self.data_path, &self.metadata_path] {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed"),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    error!(path = %path.display(), reason = %error, "failed to remove index file");
                    cleared = false;
                }
            }
        }
        cleared
    }
}

fn encode(store: &DocumentStore) -> Result<Vec<u8>> {
    let raw = bincode::serialize(store)
        .map_err(|error| PdfSearchError::Indexing(format!("cannot serialize index: {error}")))?;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

fn decode(payload: &[u8]) -> Result<DocumentStore> {
    let mut raw = Vec::new();
    ZlibDecoder::new(payload).read_to_end(&mut raw)?;
    bincode::deserialize(&raw)
        .map_err(|error| PdfSearchError::Indexing(format!("cannot deserialize index: {error}")))
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
