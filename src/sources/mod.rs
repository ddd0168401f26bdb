//! Input loaders for the open-data files
//!
//! Every loader distinguishes two kinds of failure:
//! - [`SourceError`]: the input as a whole is unusable (missing file,
//!   unreadable archive, missing required column). Fatal for a run.
//! - [`RecordError`]: one record is malformed. Logged at debug level,
//!   counted in [`LoadStats`] and skipped.

pub mod bag;
pub mod delimited;
pub mod financial;
pub mod insolvency;
pub mod kvk;
pub mod lrk;
pub mod tenderned;

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that make a whole input unusable
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Archive entry not found: {0}")]
    MissingEntry(String),

    #[error("No input files found in {0}")]
    NoInput(PathBuf),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// A single malformed record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("invalid {field}: '{value}'")]
    Invalid { field: String, value: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Accepted and skipped record counts of one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub accepted: usize,
    pub skipped: usize,
}

impl LoadStats {
    pub fn accept(&mut self) {
        self.accepted += 1;
    }

    /// Count a skipped record and log why
    pub fn skip(&mut self, source: &str, position: usize, err: &RecordError) {
        self.skipped += 1;
        debug!("{}: skipping record {}: {}", source, position, err);
    }

    pub fn total(&self) -> usize {
        self.accepted + self.skipped
    }
}

/// Whether a path names a gzip file
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Open a file for reading, transparently decompressing `.gz` files
pub fn open_input(path: &Path) -> SourceResult<Box<dyn Read>> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Short display name for log lines
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Text of a JSON scalar; objects, arrays and null give an empty string
pub(crate) fn scalar_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
