//! Text extraction from uploaded study materials.
//!
//! Dispatches on the multipart field's MIME type: PDFs through lopdf, Word
//! documents through the OOXML ZIP container, plain text as-is, and images
//! through the configured OCR provider.

use crate::error::ApiError;
use crate::ocr::OcrProvider;
use anyhow::{Context, Result};
use std::io::Read;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_JPG: &str = "image/jpg";

/// File types the upload endpoint accepts.
pub const ALLOWED_TYPES: [&str; 7] = [
    MIME_PDF, MIME_DOC, MIME_DOCX, MIME_TEXT, MIME_PNG, MIME_JPEG, MIME_JPG,
];

/// Extracted text is capped before prompting; the model only needs the gist.
pub const MAX_EXTRACTED_CHARS: usize = 10_000;

/// Decompressed bytes allowed from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub fn is_allowed(mime: &str) -> bool {
    ALLOWED_TYPES.contains(&mime)
}

/// Extract text from an uploaded file, dispatching by MIME type.
pub async fn extract_text(
    filename: &str,
    mime: &str,
    data: &[u8],
    ocr: Option<&dyn OcrProvider>,
) -> Result<String, ApiError> {
    if !is_allowed(mime) {
        return Err(ApiError::UnsupportedFileType {
            supported: ALLOWED_TYPES.to_vec(),
        });
    }

    let text = match mime {
        MIME_PDF => extract_pdf_text(data)
            .map_err(|e| ApiError::Unprocessable(format!("PDF extraction failed: {e}")))?,
        // Legacy .doc uploads are frequently renamed .docx files; the OOXML
        // path either works or reports a clear error.
        MIME_DOC | MIME_DOCX => extract_docx_text(data)
            .map_err(|e| ApiError::Unprocessable(format!("Word extraction failed: {e}")))?,
        MIME_TEXT => String::from_utf8_lossy(data).to_string(),
        MIME_PNG | MIME_JPEG | MIME_JPG => {
            let provider = ocr.ok_or_else(|| {
                ApiError::Unprocessable("Image OCR is not configured on this server".to_string())
            })?;
            provider
                .recognize(filename, data)
                .await
                .map_err(|e| ApiError::Unprocessable(format!("OCR extraction failed: {e}")))?
        }
        _ => unreachable!("mime already checked against ALLOWED_TYPES"),
    };

    if text.trim().is_empty() {
        return Err(ApiError::Unprocessable(
            "Could not extract text from document".to_string(),
        ));
    }

    Ok(truncate_chars(&text, MAX_EXTRACTED_CHARS).to_string())
}

/// Extract text from a PDF file using lopdf, page by page.
fn extract_pdf_text(data: &[u8]) -> Result<String> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data)).context("Failed to load PDF")?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(content) = doc.extract_text(&[page_num]) {
            text.push_str(&content);
            text.push('\n');
        }
    }

    Ok(text)
}

/// Extract text from a DOCX file: read `word/document.xml` from the ZIP
/// container and collect the `<w:t>` text runs.
fn extract_docx_text(data: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(data)).context("Failed to open DOCX container")?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .context("word/document.xml not found")?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .context("Failed to read word/document.xml")?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            anyhow::bail!("word/document.xml exceeds size limit");
        }
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                        out.push(' ');
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => anyhow::bail!("DOCX XML parse error: {e}"),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_mime_rejected() {
        let err = extract_text("a.zip", "application/zip", b"PK", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let text = extract_text("notes.txt", MIME_TEXT, "stacks and queues".as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(text, "stacks and queues");
    }

    #[tokio::test]
    async fn long_text_is_truncated() {
        let data = "a".repeat(MAX_EXTRACTED_CHARS + 500);
        let text = extract_text("big.txt", MIME_TEXT, data.as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(text.len(), MAX_EXTRACTED_CHARS);
    }

    #[tokio::test]
    async fn empty_text_is_unprocessable() {
        let err = extract_text("blank.txt", MIME_TEXT, b"   \n ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn invalid_pdf_rejected() {
        let err = extract_text("bad.pdf", MIME_PDF, b"not a pdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn invalid_docx_rejected() {
        let err = extract_text("bad.docx", MIME_DOCX, b"not a zip", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn image_without_ocr_provider_rejected() {
        let err = extract_text("scan.png", MIME_PNG, &[0x89, 0x50, 0x4E, 0x47], None)
            .await
            .unwrap_err();
        match err {
            ApiError::Unprocessable(details) => assert!(details.contains("not configured")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn minimal_docx_extracts_runs() {
        // Hand-built ZIP with a tiny word/document.xml
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>notes</w:t></w:r></w:p></w:body></w:document>"#;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            use std::io::Write;
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml).unwrap();
            writer.finish().unwrap();
        }
        let data = cursor.into_inner();

        let text = extract_text("notes.docx", MIME_DOCX, &data, None)
            .await
            .unwrap();
        assert_eq!(text, "Hello notes");
    }
}
