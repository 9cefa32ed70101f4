//! CSV reader
//!
//! Rows are kept as a [`Table`] so the pipeline can lay them out as aligned
//! text. The first record is the header row.

use ontograph_core::{DocumentEntry, Table};

use crate::{DocumentParser, FileType, ParserError, Result};

/// CSV document parser
pub struct CsvParser {
    /// Field delimiter
    pub delimiter: u8,
}

impl CsvParser {
    /// Create a comma-delimited parser
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Use a different delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for CsvParser {
    fn parse_bytes(&self, name: &str, bytes: &[u8]) -> Result<DocumentEntry> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ParserError::CsvError(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(ParserError::CorruptedFile(format!(
                "{name}: no columns to parse"
            )));
        }

        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record.map_err(|e| ParserError::CsvError(e.to_string()))?;
            table.push_row(record.iter().map(str::to_string).collect());
        }

        Ok(DocumentEntry::table(name, table))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Csv]
    }
}
