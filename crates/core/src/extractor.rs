use crate::error::{PdfSearchError, Result};
use crate::models::PdfMetadata;
use chrono::NaiveDateTime;
use lopdf::{Dictionary, Document, Object};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ExtractedPdf {
    pub text: String,
    pub metadata: PdfMetadata,
}

impl ExtractedPdf {
    pub fn title_or_file_name(&self, path: &Path) -> String {
        self.metadata
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| file_name(path))
    }
}

pub trait PdfExtractor: Send + Sync {
    /// Text of every readable page plus the information dictionary.
    fn extract(&self, path: &Path) -> Result<ExtractedPdf>;

    fn extract_text(&self, path: &Path) -> Result<String> {
        self.extract(path).map(|extracted| extracted.text)
    }

    fn extract_metadata(&self, path: &Path) -> Result<PdfMetadata> {
        self.extract(path).map(|extracted| extracted.metadata)
    }

    /// Never fails: falls back to the file name.
    fn extract_title(&self, path: &Path) -> String {
        match self.extract_metadata(path) {
            Ok(metadata) => metadata
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| file_name(path)),
            Err(_) => file_name(path),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    fn load(path: &Path) -> Result<Document> {
        Document::load(path).map_err(|error| PdfSearchError::pdf_processing(path, error.to_string()))
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedPdf> {
        let document = Self::load(path)?;
        let pages = document.get_pages();

        let mut parts = Vec::new();
        for page_no in pages.keys() {
            match document.extract_text(&[*page_no]) {
                Ok(text) if !text.trim().is_empty() => parts.push(text),
                Ok(_) => {}
                Err(error) => {
                    warn!(path = %path.display(), page = *page_no, reason = %error, "cannot extract page text");
                }
            }
        }

        Ok(ExtractedPdf {
            text: parts.join("\n"),
            metadata: read_metadata(&document, pages.len()),
        })
    }

    fn extract_metadata(&self, path: &Path) -> Result<PdfMetadata> {
        let document = Self::load(path)?;
        let page_count = document.get_pages().len();
        Ok(read_metadata(&document, page_count))
    }
}

fn read_metadata(document: &Document, page_count: usize) -> PdfMetadata {
    let page_count = u32::try_from(page_count).unwrap_or(u32::MAX);
    let info = match info_dictionary(document) {
        Some(info) => info,
        None => {
            return PdfMetadata {
                page_count,
                ..PdfMetadata::default()
            }
        }
    };

    PdfMetadata {
        title: info_string(info, b"Title"),
        author: info_string(info, b"Author"),
        subject: info_string(info, b"Subject"),
        creation_date: info_string(info, b"CreationDate").and_then(|raw| parse_pdf_date(&raw)),
        modification_date: info_string(info, b"ModDate").and_then(|raw| parse_pdf_date(&raw)),
        page_count,
    }
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dictionary) => Some(dictionary),
        _ => None,
    }
}

fn info_string(dictionary: &Dictionary, key: &[u8]) -> Option<String> {
    match dictionary.get(key).ok()? {
        Object::String(bytes, _) => {
            let decoded = decode_pdf_string(bytes);
            let trimmed = decoded.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// UTF-16BE when prefixed with a byte-order mark, single-byte text otherwise.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Parses `D:YYYYMMDDHHmmSS`; anything after the first 14 digits is ignored.
pub fn parse_pdf_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let value = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let head = value.get(..14)?;
    NaiveDateTime::parse_from_str(head, "%Y%m%d%H%M%S").ok()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use std::fs;
    use tempfile::tempdir;

    /// One Courier text line per entry of `pages`.
    fn build_document(pages: &[&str]) -> Result<Document, Box<dyn std::error::Error>> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages.len() as i64),
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        Ok(document)
    }

    #[test]
    fn well_formed_pdf_yields_text_and_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let mut document = build_document(&["First page text", "Second page text"])?;
        let info_id = document.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly Figures"),
            "Author" => Object::string_literal("Finance Team"),
            "CreationDate" => Object::string_literal("D:20230115083000Z"),
        });
        document.trailer.set("Info", info_id);

        let dir = tempdir()?;
        let path = dir.path().join("figures.pdf");
        document.save(&path)?;

        let extracted = LopdfExtractor.extract(&path)?;

        assert_eq!(extracted.metadata.page_count, 2);
        assert_eq!(extracted.metadata.title.as_deref(), Some("Quarterly Figures"));
        assert_eq!(extracted.metadata.author.as_deref(), Some("Finance Team"));
        assert_eq!(extracted.metadata.subject, None);
        assert_eq!(
            extracted.metadata.creation_date,
            parse_pdf_date("D:20230115083000")
        );
        assert!(extracted.metadata.creation_date.is_some());
        assert_eq!(extracted.metadata.modification_date, None);

        let first = extracted.text.find("First page text").ok_or("first page missing")?;
        let second = extracted.text.find("Second page text").ok_or("second page missing")?;
        assert!(first < second);
        assert!(extracted.text[first..second].contains('\n'));

        assert_eq!(LopdfExtractor.extract_title(&path), "Quarterly Figures");
        Ok(())
    }

    #[test]
    fn inline_info_dictionary_is_read() -> Result<(), Box<dyn std::error::Error>> {
        let mut document = build_document(&["Only page"])?;
        document.trailer.set(
            "Info",
            dictionary! {
                "Title" => Object::string_literal("   "),
                "Subject" => Object::String(vec![0xFE, 0xFF, 0x00, 0x5A, 0x00, 0xF3], lopdf::StringFormat::Hexadecimal),
            },
        );

        let metadata = read_metadata(&document, document.get_pages().len());

        assert_eq!(metadata.page_count, 1);
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.subject.as_deref(), Some("Zó"));
        Ok(())
    }

    #[test]
    fn missing_info_dictionary_keeps_page_count() -> Result<(), Box<dyn std::error::Error>> {
        let document = build_document(&["one", "two", "three"])?;
        let metadata = read_metadata(&document, document.get_pages().len());
        assert_eq!(metadata.page_count, 3);
        assert_eq!(metadata.title, None);
        Ok(())
    }

    #[test]
    fn pdf_dates_parse_with_and_without_prefix() {
        let date = parse_pdf_date("D:20230115083000+01'00'").expect("date with prefix");
        assert_eq!(date.year(), 2023);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 8);
        assert_eq!(date.minute(), 30);

        assert_eq!(parse_pdf_date("20230115083000"), Some(date));
    }

    #[test]
    fn malformed_dates_are_absent() {
        assert_eq!(parse_pdf_date(""), None);
        assert_eq!(parse_pdf_date("D:2023"), None);
        assert_eq!(parse_pdf_date("D:2023AB15083000"), None);
        assert_eq!(parse_pdf_date("D:20231345083000"), None);
    }

    #[test]
    fn pdf_strings_decode_utf16_and_single_byte() {
        assert_eq!(decode_pdf_string(b"Annual Report"), "Annual Report");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x5A, 0x00, 0xF3]), "Zó");
    }

    #[test]
    fn broken_pdf_is_a_processing_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let extractor = LopdfExtractor;
        assert!(matches!(
            extractor.extract_text(&path),
            Err(PdfSearchError::PdfProcessing { .. })
        ));
        assert_eq!(extractor.extract_title(&path), "broken.pdf");
        Ok(())
    }

    #[test]
    fn title_prefers_metadata() {
        let extracted = ExtractedPdf {
            text: String::new(),
            metadata: PdfMetadata {
                title: Some("Quarterly Figures".to_string()),
                ..PdfMetadata::default()
            },
        };
        assert_eq!(extracted.title_or_file_name(Path::new("/tmp/q.pdf")), "Quarterly Figures");
        assert_eq!(ExtractedPdf::default().title_or_file_name(Path::new("/tmp/q.pdf")), "q.pdf");
    }
}
