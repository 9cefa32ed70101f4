//! DOCX document reader using docx-rs
//!
//! Only body paragraphs are read; each paragraph becomes one line.

use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};
use ontograph_core::DocumentEntry;

use crate::{DocumentParser, FileType, ParserError, Result};

/// DOCX document parser
pub struct DocxParser;

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

impl DocumentParser for DocxParser {
    fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry> {
        let docx = read_docx(bytes).map_err(|e| ParserError::DocxError(format!("{name}: {e}")))?;

        let paragraphs: Vec<String> = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
                _ => None,
            })
            .collect();

        Ok(DocumentEntry::text(name, paragraphs.join("\n")))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Docx]
    }
}
