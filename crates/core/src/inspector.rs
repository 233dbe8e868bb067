use crate::error::{PdfSearchError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";
const SNIFF_LEN: usize = 512;

/// Determines a file's content type from its bytes, never from its name.
pub trait ContentInspector: Send + Sync {
    fn mime_type(&self, path: &Path) -> Result<String>;
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", PDF_MIME),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"%!PS", "application/postscript"),
    (b"{\\rtf", "text/rtf"),
];

/// Magic-number sniffing over the first bytes of a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureInspector;

impl SignatureInspector {
    pub fn classify(head: &[u8]) -> &'static str {
        if head.is_empty() {
            return "application/x-empty";
        }
        if let Some((_, mime)) = SIGNATURES
            .iter()
            .find(|(signature, _)| head.starts_with(signature))
        {
            return *mime;
        }
        if !head.contains(&0) && is_utf8_prefix(head) {
            return "text/plain";
        }
        "application/octet-stream"
    }
}

// The sniffed window may end inside a multi-byte character.
fn is_utf8_prefix(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(error) => error.error_len().is_none(),
    }
}

impl ContentInspector for SignatureInspector {
    fn mime_type(&self, path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|error| {
            PdfSearchError::pdf_processing(path, format!("cannot open file: {error}"))
        })?;

        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .map_err(|error| {
                PdfSearchError::pdf_processing(path, format!("cannot read file header: {error}"))
            })?;

        Ok(Self::classify(&head).to_string())
    }
}
