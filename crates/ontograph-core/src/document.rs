//! Document entries handed to the pipeline
//!
//! A document is either free text or a table. Tables are flattened into an
//! index-prefixed, column-aligned text block before chunking so that the
//! LLM sees rows laid out the way a spreadsheet dump reads.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Name given to pasted text that did not come from a file
pub const RAW_TEXT_NAME: &str = "raw_text";

/// Placeholder for cells missing from short rows
const MISSING_CELL: &str = "NaN";

/// Column separator in the printable table form
const COLUMN_GAP: &str = "  ";

/// Tabular content (header row plus records)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column headers
    pub headers: Vec<String>,

    /// Data rows; may be shorter than the header row
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a data row
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Builder-style row append
    pub fn with_row(mut self, row: Vec<String>) -> Self {
        self.push_row(row);
        self
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as aligned text with a leading row index column.
    ///
    /// Cells are right-aligned to the widest value in their column and
    /// separated by two spaces. Tables without rows print their column list.
    pub fn to_text(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Empty table\nColumns: [{}]\nIndex: []",
                self.headers.join(", ")
            );
        }

        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len());

        let header_at = |i: usize| self.headers.get(i).map(String::as_str).unwrap_or("");
        let cell_at = |row: &[String], i: usize| -> String {
            row.get(i)
                .cloned()
                .unwrap_or_else(|| MISSING_CELL.to_string())
        };

        let widths: Vec<usize> = (0..columns)
            .map(|i| {
                self.rows
                    .iter()
                    .map(|row| cell_at(row, i).chars().count())
                    .chain(std::iter::once(header_at(i).chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let index_width = (self.rows.len() - 1).to_string().len();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let mut header_line = " ".repeat(index_width);
        for (i, width) in widths.iter().enumerate() {
            header_line.push_str(COLUMN_GAP);
            header_line.push_str(&format!("{:>width$}", header_at(i), width = width));
        }
        lines.push(header_line);

        for (index, row) in self.rows.iter().enumerate() {
            let mut line = format!("{:<width$}", index, width = index_width);
            for (i, width) in widths.iter().enumerate() {
                line.push_str(COLUMN_GAP);
                line.push_str(&format!("{:>width$}", cell_at(row, i), width = width));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

/// Content of a document entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DocumentContent {
    Text(String),
    Table(Table),
}

/// A named document queued for extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Document name, recorded as provenance on every extracted node
    pub name: String,

    /// Document body
    pub content: DocumentContent,
}

impl DocumentEntry {
    /// Create a text document
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Text(text.into()),
        }
    }

    /// Create a tabular document
    pub fn table(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Table(table),
        }
    }

    /// Create an entry for pasted text
    pub fn raw_text(text: impl Into<String>) -> Self {
        Self::text(RAW_TEXT_NAME, text)
    }

    /// Text the chunker sees for this entry
    pub fn to_text(&self) -> Cow<'_, str> {
        match &self.content {
            DocumentContent::Text(text) => Cow::Borrowed(text.as_str()),
            DocumentContent::Table(table) => Cow::Owned(table.to_text()),
        }
    }

    /// True when the entry has nothing but whitespace
    pub fn is_blank(&self) -> bool {
        match &self.content {
            DocumentContent::Text(text) => text.trim().is_empty(),
            DocumentContent::Table(table) => table.headers.is_empty() && table.is_empty(),
        }
    }
}
