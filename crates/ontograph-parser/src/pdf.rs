//! PDF document reader using pdf-extract

use ontograph_core::DocumentEntry;

use crate::{DocumentParser, FileType, ParserError, Result};

/// Extracts the text of every page, concatenated in page order
pub struct PdfParser;

impl PdfParser {
    /// Extract and trim text from PDF bytes
    pub fn extract_text(bytes: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        // pdf-extract separates pages with form feeds
        Ok(text.replace('\x0C', "\n").trim().to_string())
    }
}

impl DocumentParser for PdfParser {
    fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ParserError::CorruptedFile(format!(
                "{name}: missing PDF header"
            )));
        }

        Ok(DocumentEntry::text(name, Self::extract_text(bytes)?))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }
}
