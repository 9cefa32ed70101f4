//! Plain text and Markdown reader

use ontograph_core::DocumentEntry;

use crate::{DocumentParser, FileType, ParserError, Result};

const UTF8_BOM: char = '\u{feff}';

/// Reads UTF-8 text files verbatim
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ParserError::EncodingError(format!("{name}: {e}")))?;

        Ok(DocumentEntry::text(
            name,
            text.strip_prefix(UTF8_BOM).unwrap_or(text),
        ))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::PlainText, FileType::Markdown]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontograph_core::DocumentContent;

    #[test]
    fn test_reads_utf8() {
        let entry = PlainTextParser
            .parse_bytes("a.txt", "Zoë met Ümit.".as_bytes())
            .unwrap();
        assert_eq!(entry.content, DocumentContent::Text("Zoë met Ümit.".to_string()));
    }

    #[test]
    fn test_strips_bom() {
        let entry = PlainTextParser
            .parse_bytes("a.txt", "\u{feff}hello".as_bytes())
            .unwrap();
        assert_eq!(entry.to_text(), "hello");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = PlainTextParser.parse_bytes("a.txt", &[0xff, 0xfe, 0x41]).unwrap_err();
        assert!(matches!(err, ParserError::EncodingError(_)));
    }

    #[test]
    fn test_supported_types() {
        assert!(PlainTextParser.can_parse(FileType::Markdown));
        assert!(!PlainTextParser.can_parse(FileType::Pdf));
    }
}
