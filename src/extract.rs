//! Multi-format text extraction for uploaded lecture notes.
//!
//! The dispatcher routes by file extension; per-format extractors turn raw
//! bytes into plain UTF-8 text. Extraction is all-or-nothing per file: on
//! error the caller gets an [`ExtractError`] and no partial output.

use std::io::Read;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Entry inside a docx archive holding the main document body.
const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Extensions the dispatcher recognizes. [`extract_text`] has a branch for
/// each entry; `supported_extension` is how other layers (the upload
/// pipeline's strict pre-check) ask without duplicating the list.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["docx", "pdf", "txt"];

/// True when the dispatcher has an extractor for this (lowercased) extension.
pub fn supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// Policy for file extensions the dispatcher does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedPolicy {
    /// Reject with [`ExtractError::UnsupportedType`].
    Reject,
    /// Treat as an empty extraction result.
    Empty,
}

/// Extraction error. Callers surface the message and skip the file; other
/// files in the same course are unaffected.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedType(String),
    /// Byte payload is not a readable ZIP archive.
    InvalidArchive(String),
    /// ZIP was fine but the document XML is malformed.
    InvalidDocument(String),
    /// Archive lacks the `word/document.xml` entry.
    MissingDocumentBody,
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedType(ext) => write!(f, "unsupported file type: {}", ext),
            ExtractError::InvalidArchive(e) => write!(f, "invalid archive: {}", e),
            ExtractError::InvalidDocument(e) => write!(f, "invalid document: {}", e),
            ExtractError::MissingDocumentBody => write!(f, "missing document body"),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl ExtractError {
    /// True for inputs the dispatcher refused outright (client error), as
    /// opposed to files it tried and failed to decode.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ExtractError::UnsupportedType(_))
    }
}

/// Extension of a file name: the substring after the last `.`, lowercased.
/// `None` when there is no dot or nothing after it.
pub fn file_extension(name: &str) -> Option<String> {
    let ext = name.rsplit_once('.')?.1;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Extracts plain text from an uploaded file, dispatching on its extension.
///
/// Recognized extensions: `docx`, `pdf`, `txt`. Anything else is handled per
/// `policy`: rejected, or passed through as an empty result.
pub fn extract_text(
    file_name: &str,
    bytes: &[u8],
    policy: UnsupportedPolicy,
) -> Result<String, ExtractError> {
    let ext = file_extension(file_name).unwrap_or_default();
    match ext.as_str() {
        "docx" => extract_docx(bytes),
        "pdf" => extract_pdf(bytes),
        "txt" => Ok(extract_txt(bytes)),
        other => match policy {
            UnsupportedPolicy::Reject => Err(ExtractError::UnsupportedType(other.to_string())),
            UnsupportedPolicy::Empty => Ok(String::new()),
        },
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Plain text is decoded lossily; replacement characters beat a hard failure
/// since there is no structural validity to violate.
fn extract_txt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = match archive.by_name(DOCX_BODY_ENTRY) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(ExtractError::MissingDocumentBody)
            }
            Err(e) => return Err(ExtractError::InvalidArchive(e.to_string())),
        };
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::InvalidArchive(format!(
                "{} exceeds size limit",
                DOCX_BODY_ENTRY
            )));
        }
    }

    extract_docx_body(&doc_xml)
}

/// Walks the document XML collecting `w:t` text in document order. Paragraph
/// (`w:p`) boundaries become newlines; runs within a paragraph concatenate.
fn extract_docx_body(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::InvalidDocument(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(quick_xml::events::Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    // Paragraph boundary.
                    b"p" => out.push('\n'),
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::InvalidDocument(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    while out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())
                .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    /// Minimal valid single-page PDF showing `phrase` in Helvetica. Body
    /// first, then an xref with correct byte offsets so the parser accepts it.
    fn pdf_with_phrase(phrase: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        let o4 = out.len();
        out.extend_from_slice(
            format!(
                "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content.len(),
                content
            )
            .as_bytes(),
        );
        let o5 = out.len();
        out.extend_from_slice(
            b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 6\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in [o1, o2, o3, o4, o5] {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn extension_is_lowercased_last_segment() {
        assert_eq!(file_extension("Notes.DOCX").as_deref(), Some("docx"));
        assert_eq!(file_extension("a.b.pdf").as_deref(), Some("pdf"));
        assert_eq!(file_extension("no_extension"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn txt_is_lossy_passthrough() {
        let text =
            extract_text("notes.txt", b"plain \xff text", UnsupportedPolicy::Reject).unwrap();
        assert!(text.starts_with("plain "));
        assert!(text.contains('\u{FFFD}'));
        assert!(text.ends_with(" text"));
    }

    #[test]
    fn docx_preserves_paragraph_breaks() {
        let bytes = docx_with_paragraphs(&["First paragraph.", "Second paragraph."]);
        let text = extract_text("lecture.docx", &bytes, UnsupportedPolicy::Reject).unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn docx_concatenates_runs_within_paragraph() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(
                b"<w:document xmlns:w=\"x\"><w:body><w:p><w:r><w:t>Hello, </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p></w:body></w:document>",
            )
            .unwrap();
            zip.finish().unwrap();
        }
        let text = extract_text("a.docx", &buf, UnsupportedPolicy::Reject).unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn docx_without_body_entry_is_missing_body() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text("a.docx", &buf, UnsupportedPolicy::Reject).unwrap_err();
        assert!(matches!(err, ExtractError::MissingDocumentBody));
    }

    #[test]
    fn invalid_zip_is_invalid_archive() {
        let err = extract_text("a.docx", b"not a zip", UnsupportedPolicy::Reject).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidArchive(_)));
    }

    #[test]
    fn malformed_xml_is_invalid_document() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<w:document><w:p><w:t>broken &#xZZ; entity</w:t></w:p></w:document>")
                .unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text("a.docx", &buf, UnsupportedPolicy::Reject).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidDocument(_)));
    }

    #[test]
    fn well_formed_pdf_extracts_text() {
        let bytes = pdf_with_phrase("mitosis has four phases");
        let text = extract_text("lecture.pdf", &bytes, UnsupportedPolicy::Reject).unwrap();
        assert!(
            text.contains("mitosis has four phases"),
            "extracted: {:?}",
            text
        );
    }

    #[test]
    fn every_supported_extension_dispatches() {
        // Unknown bytes may fail to decode, but no listed extension may be
        // refused as unsupported.
        for ext in SUPPORTED_EXTENSIONS {
            assert!(supported_extension(ext));
            let result = extract_text(&format!("f.{}", ext), b"", UnsupportedPolicy::Reject);
            assert!(
                !matches!(result, Err(ExtractError::UnsupportedType(_))),
                "dispatcher refused listed extension {}",
                ext
            );
        }
    }

    #[test]
    fn corrupt_pdf_is_pdf_error() {
        let err = extract_text("a.pdf", b"not a pdf", UnsupportedPolicy::Reject).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn unsupported_extension_strict_rejects() {
        let err = extract_text("tool.exe", b"MZ", UnsupportedPolicy::Reject).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(ref e) if e == "exe"));
    }

    #[test]
    fn unsupported_extension_permissive_is_empty() {
        let text = extract_text("tool.exe", b"MZ", UnsupportedPolicy::Empty).unwrap();
        assert_eq!(text, "");
    }
}
