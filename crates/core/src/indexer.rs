use crate::error::Result;
use crate::extractor::PdfExtractor;
use crate::models::DocumentIndex;
use crate::normalizer::TextNormalizer;
use crate::store::DocumentStore;
use crate::tasks::TaskProgress;
use crate::validator::{FileValidator, ScanReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IndexingReport {
    /// Fully built replacement store: the base entries plus everything indexed.
    pub store: Arc<DocumentStore>,
    pub indexed: usize,
    pub skipped_files: Vec<SkippedPdf>,
    pub scan: ScanReport,
}

/// Cheap to clone, so a copy can be moved onto a background task while the
/// owning engine keeps serving searches from its current store.
#[derive(Clone)]
pub struct Indexer {
    normalizer: Arc<TextNormalizer>,
    extractor: Arc<dyn PdfExtractor>,
    validator: Arc<FileValidator>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        normalizer: Arc<TextNormalizer>,
        extractor: Arc<dyn PdfExtractor>,
        validator: Arc<FileValidator>,
        batch_size: usize,
    ) -> Self {
        Self {
            normalizer,
            extractor,
            validator,
            batch_size: batch_size.max(1),
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    pub fn build_document(&self, path: &str, text: &str, title: &str, page_count: u32) -> DocumentIndex {
        DocumentIndex {
            file_path: path.to_string(),
            title: title.to_string(),
            page_count,
            content: text.to_string(),
            processed_doc: self.normalizer.process(text),
        }
    }

    pub fn index_file(&self, path: &Path) -> Result<DocumentIndex> {
        let extracted = self.extractor.extract(path)?;
        let title = extracted.title_or_file_name(path);
        Ok(self.build_document(
            &path.to_string_lossy(),
            &extracted.text,
            &title,
            extracted.metadata.page_count,
        ))
    }

    /// Scans `directory` recursively and indexes every valid PDF on top of
    /// `base`. Extraction failures are logged and skipped.
    pub fn index_directory(
        &self,
        directory: &Path,
        base: &DocumentStore,
        progress: &TaskProgress,
    ) -> Result<IndexingReport> {
        let scan = self.validator.scan(directory, true)?;
        let valid_paths = &scan.valid_files;
        progress.set_total(valid_paths.len());

        let mut staged = base.clone();
        let mut indexed = 0;
        let mut skipped_files = Vec::new();

        for (batch_no, batch) in valid_paths.chunks(self.batch_size).enumerate() {
            for path in batch {
                match self.index_file(path) {
                    Ok(document) => {
                        staged.insert(document);
                        indexed += 1;
                    }
                    Err(error) => {
                        warn!(path = %path.display(), reason = %error, "skipped pdf");
                        skipped_files.push(SkippedPdf {
                            path: path.clone(),
                            reason: error.to_string(),
                        });
                    }
                }
                progress.advance(1);
            }
            info!(
                batch = batch_no + 1,
                done = progress.snapshot().completed,
                total = valid_paths.len(),
                "indexed batch"
            );
        }

        info!(
            directory = %directory.display(),
            indexed,
            skipped = skipped_files.len(),
            invalid = scan.invalid_count(),
            "directory indexed"
        );

        Ok(IndexingReport {
            store: Arc::new(staged),
            indexed,
            skipped_files,
            scan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfSearchError;
    use crate::extractor::ExtractedPdf;
    use crate::models::PdfMetadata;
    use crate::stopwords::Language;
    use std::fs;
    use tempfile::tempdir;

    /// Serves the file's bytes after the header line as its text.
    struct FakeExtractor;

    impl PdfExtractor for FakeExtractor {
        fn extract(&self, path: &Path) -> Result<ExtractedPdf> {
            let raw = fs::read_to_string(path)?;
            if raw.contains("unreadable") {
                return Err(PdfSearchError::pdf_processing(path, "no readable text"));
            }
            let text = raw.lines().skip(1).collect::<Vec<_>>().join("\n");
            Ok(ExtractedPdf {
                text,
                metadata: PdfMetadata {
                    page_count: 2,
                    ..PdfMetadata::default()
                },
            })
        }
    }

    fn indexer(batch_size: usize) -> Indexer {
        Indexer::new(
            Arc::new(TextNormalizer::for_language(Language::English).expect("normalizer")),
            Arc::new(FakeExtractor),
            Arc::new(FileValidator::new()),
            batch_size,
        )
    }

    #[test]
    fn best_effort_skips_unreadable_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("good.pdf"), b"%PDF-1.4\nRust search engines")?;
        fs::write(dir.path().join("bad.pdf"), b"%PDF-1.4\nunreadable")?;
        fs::write(dir.path().join("fake.pdf"), b"plain text")?;

        let progress = TaskProgress::default();
        let report = indexer(1).index_directory(dir.path(), &DocumentStore::new(), &progress)?;

        assert_eq!(report.indexed, 1);
        assert_eq!(report.store.len(), 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("bad.pdf")
        );
        assert_eq!(report.scan.invalid_count(), 1);
        assert_eq!(progress.snapshot().completed, 2);

        let good = report
            .store
            .iter()
            .next()
            .ok_or("indexed document missing")?;
        assert_eq!(good.title, "good.pdf");
        assert_eq!(good.page_count, 2);
        assert_eq!(good.content, "Rust search engines");
        assert_eq!(good.processed_doc.tokens, vec!["rust", "search", "engine"]);
        Ok(())
    }

    #[test]
    fn base_entries_survive_and_are_replaced_per_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"%PDF-1.4\nfresh text")?;

        let indexer = indexer(10);
        let mut base = DocumentStore::new();
        base.insert(indexer.build_document(&path.to_string_lossy(), "stale text", "a", 1));
        base.insert(indexer.build_document("/elsewhere/b.pdf", "other", "b", 1));

        let report = indexer.index_directory(dir.path(), &base, &TaskProgress::default())?;

        assert_eq!(report.store.len(), 2);
        let replaced = report
            .store
            .get(path.to_string_lossy().as_ref())
            .ok_or("replaced document missing")?;
        assert_eq!(replaced.content, "fresh text");
        assert_eq!(base.len(), 2);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_reach_the_extractor() -> Result<(), Box<dyn std::error::Error>> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir()?;
        fs::write(
            dir.path().join(OsStr::from_bytes(b"caf\xe9.pdf")),
            b"%PDF-1.4\nespresso notes",
        )?;

        let report = indexer(4).index_directory(dir.path(), &DocumentStore::new(), &TaskProgress::default())?;

        assert_eq!(report.indexed, 1);
        assert!(report.skipped_files.is_empty());
        let document = report.store.iter().next().ok_or("indexed document missing")?;
        assert_eq!(document.content, "espresso notes");
        Ok(())
    }

    #[test]
    fn empty_directory_yields_empty_report() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let report = indexer(5).index_directory(dir.path(), &DocumentStore::new(), &TaskProgress::default())?;
        assert_eq!(report.indexed, 0);
        assert!(report.store.is_empty());
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = indexer(5).index_directory(
            Path::new("/no/such/dir"),
            &DocumentStore::new(),
            &TaskProgress::default(),
        );
        assert!(matches!(result, Err(PdfSearchError::DirectoryNotFound(_))));
    }
}
