use crate::error::{PdfSearchError, Result};
use crate::inspector::{ContentInspector, SignatureInspector, PDF_MIME};
use crate::models::FileRecord;
use crate::tasks::TaskProgress;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const PDF_SIGNATURE: &[u8] = b"%PDF";
const PDF_EXTENSION: &[u8] = b".pdf";

/// Matches on the raw name bytes, so names that are not valid UTF-8 qualify too.
pub fn is_pdf_candidate(path: &Path) -> bool {
    path.file_name().is_some_and(|name| {
        let bytes = name.as_encoded_bytes();
        bytes.len() >= PDF_EXTENSION.len()
            && bytes[bytes.len() - PDF_EXTENSION.len()..].eq_ignore_ascii_case(PDF_EXTENSION)
    })
}

/// Candidate files under `folder`, sorted. Subdirectories are skipped unless
/// `recursive` is set.
pub fn discover_pdf_files(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PdfSearchError::DirectoryNotFound(folder.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), reason = %error, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        if is_pdf_candidate(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub records: Vec<FileRecord>,
    /// Paths of the valid records exactly as found on disk. `FileRecord.path`
    /// is a lossy rendering for names that are not valid UTF-8.
    pub valid_files: Vec<PathBuf>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.records.len() - self.valid_count()
    }
}

pub struct FileValidator {
    inspector: Box<dyn ContentInspector>,
    files: RwLock<HashMap<String, FileRecord>>,
    scan_lock: Mutex<()>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FileValidator {
    pub fn new() -> Self {
        Self::with_inspector(Box::new(SignatureInspector))
    }

    pub fn with_inspector(inspector: Box<dyn ContentInspector>) -> Self {
        Self {
            inspector,
            files: RwLock::new(HashMap::new()),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn scan(&self, directory: &Path, recursive: bool) -> Result<ScanReport> {
        self.scan_with_progress(directory, recursive, &TaskProgress::default())
    }

    /// Validates every candidate on the rayon pool. Invalid PDFs come back as
    /// records with `is_valid == false`; files that could not be inspected at
    /// all are reported as failures and left out of the record map.
    pub fn scan_with_progress(
        &self,
        directory: &Path,
        recursive: bool,
        progress: &TaskProgress,
    ) -> Result<ScanReport> {
        let _scan = self.scan_lock.lock();
        let candidates = discover_pdf_files(directory, recursive)?;
        progress.set_total(candidates.len());
        debug!(directory = %directory.display(), candidates = candidates.len(), "scanning");

        let outcomes: Vec<(PathBuf, Result<FileRecord>)> = candidates
            .par_iter()
            .map(|path| {
                let outcome = self.validate_file(path);
                if let Ok(record) = &outcome {
                    self.files.write().insert(record.path.clone(), record.clone());
                }
                progress.advance(1);
                (path.clone(), outcome)
            })
            .collect();

        let mut report = ScanReport::default();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(record) => {
                    if record.is_valid {
                        report.valid_files.push(path);
                    }
                    report.records.push(record);
                }
                Err(error) => {
                    warn!(path = %path.display(), reason = %error, "failed to validate file");
                    report.failures.push(ScanFailure {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            directory = %directory.display(),
            valid = report.valid_count(),
            invalid = report.invalid_count(),
            failed = report.failures.len(),
            "scan finished"
        );
        Ok(report)
    }

    pub fn validate_file(&self, path: &Path) -> Result<FileRecord> {
        if !path.is_file() {
            return Err(PdfSearchError::pdf_processing(path, "file does not exist"));
        }

        let metadata = fs::metadata(path).map_err(|error| {
            PdfSearchError::pdf_processing(path, format!("cannot read file metadata: {error}"))
        })?;
        let modified = metadata.modified().map_err(|error| {
            PdfSearchError::pdf_processing(path, format!("cannot read modification time: {error}"))
        })?;

        let record = FileRecord {
            path: path.to_string_lossy().to_string(),
            size: metadata.len(),
            modified_time: DateTime::<Utc>::from(modified),
            is_valid: false,
            error_message: None,
        };

        let mime_type = self.inspector.mime_type(path)?;
        if mime_type != PDF_MIME {
            return Ok(record.invalid(format!("invalid content type: {mime_type}")));
        }

        if read_signature(path)? != PDF_SIGNATURE {
            return Ok(record.invalid("missing %PDF signature"));
        }

        Ok(FileRecord {
            is_valid: true,
            ..record
        })
    }

    pub fn file_info(&self, path: &Path) -> Option<FileRecord> {
        self.files.read().get(path.to_string_lossy().as_ref()).cloned()
    }

    /// True when the file is newer than its last scan, or was never scanned.
    pub fn check_changed(&self, path: &Path) -> Result<bool> {
        let recorded = match self.file_info(path) {
            Some(record) => record.modified_time,
            None => return Ok(true),
        };

        let modified = fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|error| {
                PdfSearchError::FileOperation(format!(
                    "cannot check modification of {}: {error}",
                    path.display()
                ))
            })?;

        Ok(DateTime::<Utc>::from(modified) > recorded)
    }

    pub fn valid_paths(&self) -> Vec<String> {
        let mut paths = self
            .files
            .read()
            .values()
            .filter(|record| record.is_valid)
            .map(|record| record.path.clone())
            .collect::<Vec<_>>();
        paths.sort_unstable();
        paths
    }

    pub fn invalid_paths(&self) -> BTreeMap<String, String> {
        self.files
            .read()
            .values()
            .filter(|record| !record.is_valid)
            .filter_map(|record| {
                record
                    .error_message
                    .as_ref()
                    .map(|message| (record.path.clone(), message.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    pub fn clear(&self) {
        self.files.write().clear();
    }
}

fn read_signature(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|error| {
        PdfSearchError::pdf_processing(path, format!("cannot open file: {error}"))
    })?;
    let mut head = Vec::with_capacity(PDF_SIGNATURE.len());
    file.take(PDF_SIGNATURE.len() as u64)
        .read_to_end(&mut head)
        .map_err(|error| {
            PdfSearchError::pdf_processing(path, format!("cannot read file header: {error}"))
        })?;
    Ok(head)
}
