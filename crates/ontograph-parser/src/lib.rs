//! ontograph Parser - Document readers for the extraction pipeline
//!
//! Supports reading:
//! - Plain text and Markdown files
//! - CSV files (kept as tables)
//! - PDF documents
//! - Microsoft Word (DOCX)
//!
//! Each reader implements the `DocumentParser` trait and produces a
//! `DocumentEntry` ready for chunking. Readers work on raw bytes so the same
//! code serves files on disk and multipart uploads.

pub mod delimited;
pub mod docx;
pub mod pdf;
pub mod text;

pub use delimited::CsvParser;
pub use docx::DocxParser;
pub use pdf::PdfParser;
pub use text::PlainTextParser;

use ontograph_core::DocumentEntry;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// DOCX parsing error
    #[error("DOCX parsing error: {0}")]
    DocxError(String),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    CsvError(String),

    /// File is corrupted or malformed
    #[error("File is corrupted or malformed: {0}")]
    CorruptedFile(String),

    /// Encoding error
    #[error("Text encoding error: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// File Types
// ============================================================================

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Csv,
    Pdf,
    Docx,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Self::PlainText,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path or file name
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainText => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Csv => write!(f, "csv"),
            Self::Pdf => write!(f, "pdf"),
            Self::Docx => write!(f, "docx"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for document readers
pub trait DocumentParser: Send + Sync {
    /// Read a document from its bytes; `name` becomes the entry name
    fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry>;

    /// Get supported file types
    fn supported_types(&self) -> &[FileType];

    /// Read a document from a file path
    fn parse(&self, path: &Path) -> Result<DocumentEntry> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        self.parse_bytes(&display_name(path), &bytes)
    }

    /// Check if this parser can handle a file type
    fn can_parse(&self, file_type: FileType) -> bool {
        self.supported_types().contains(&file_type)
    }
}

/// File name used as the document name
fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Registry of available parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with every built-in reader
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlainTextParser);
        registry.register(CsvParser::new());
        registry.register(PdfParser);
        registry.register(DocxParser);
        registry
    }

    /// Register a parser
    pub fn register<P: DocumentParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find a parser for a file type
    pub fn find_parser(&self, file_type: FileType) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(file_type))
            .map(|p| p.as_ref())
    }

    fn parser_for(&self, name: &str) -> Result<&dyn DocumentParser> {
        let file_type = FileType::from_path(Path::new(name));

        if file_type == FileType::Unknown {
            return Err(ParserError::UnsupportedFormat(
                Path::new(name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("none")
                    .to_string(),
            ));
        }

        self.find_parser(file_type)
            .ok_or_else(|| ParserError::UnsupportedFormat(file_type.to_string()))
    }

    /// Read a file using the appropriate parser
    pub fn parse(&self, path: &Path) -> Result<DocumentEntry> {
        self.parser_for(&display_name(path))?.parse(path)
    }

    /// Read uploaded bytes, picking the parser from the file name
    pub fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry> {
        self.parser_for(name)?.parse_bytes(name, bytes)
    }

    /// Read every path, skipping files that fail
    pub fn load_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<DocumentEntry> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            match self.parse(path) {
                Ok(entry) => {
                    info!(document = %entry.name, "Loaded document");
                    entries.push(entry);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
        }
        entries
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// Tests
// ============================================================================
