//! Delimited tables (CSV with a configurable separator)
//!
//! Tables are read fully into memory as strings. Rows shorter than the
//! header are allowed; missing cells read as the empty string.

use super::{display_name, open_input, SourceError, SourceResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Character encoding of a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is one code point
    Latin1,
}

impl Encoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// An in-memory table with named columns
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column that must be present
    pub fn column(&self, name: &str) -> SourceResult<usize> {
        self.optional_column(name)
            .ok_or_else(|| SourceError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Index of a column that may be absent
    pub fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Cell `idx` of a row, or `""` when the row is short or the column absent
pub fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

/// Read a delimited file (plain or gzip) with a header row
pub fn read_table(path: &Path, delimiter: u8, encoding: Encoding) -> SourceResult<Table> {
    let input = open_input(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| encoding.decode(h).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(record.iter().map(|f| encoding.decode(f)).collect());
    }

    debug!(
        "Read {} rows x {} columns from {}",
        rows.len(),
        headers.len(),
        display_name(path)
    );

    Ok(Table {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Parse a single-byte delimiter from configuration (`";"`, `","`, `"\t"`)
pub fn parse_delimiter(value: &str) -> Option<u8> {
    match value {
        "\\t" | "\t" | "tab" => Some(b'\t'),
        s if s.len() == 1 => s.bytes().next(),
        _ => None,
    }
}
