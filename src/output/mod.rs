//! Collected item writers and run summaries

use crate::CollectedItem;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub mod csv;
pub mod json;
pub mod path;
pub mod summary;

pub use self::csv::CsvItemWriter;
pub use self::json::JsonItemWriter;
pub use self::path::{summary_path_for, timestamped_path};
pub use self::summary::RunSummary;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Unknown file format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing collected items
pub trait ItemWriter: OutputWriter {
    /// Write a single item
    fn write_item(&mut self, item: &CollectedItem) -> OutputResult<()>;

    /// Write multiple items at once
    fn write_items(&mut self, items: &[CollectedItem]) -> OutputResult<()> {
        for item in items {
            self.write_item(item)?;
        }
        Ok(())
    }

    /// Number of items written so far
    fn items_written(&self) -> u64;
}

/// Item file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// One row per item
    #[default]
    Csv,
    /// JSON array of items
    Json,
}

impl FileFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }

    /// Infer the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for FileFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            other => Err(OutputError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Type-safe dispatch over the supported item writers
pub enum FileItemWriter {
    /// CSV output
    Csv(CsvItemWriter),
    /// JSON output
    Json(JsonItemWriter),
}

impl FileItemWriter {
    /// Create a writer for `path` in `format`
    pub fn create<P: AsRef<Path>>(path: P, format: FileFormat) -> OutputResult<Self> {
        match format {
            FileFormat::Csv => Ok(FileItemWriter::Csv(CsvItemWriter::new(path)?)),
            FileFormat::Json => Ok(FileItemWriter::Json(JsonItemWriter::new(path)?)),
        }
    }
}

impl OutputWriter for FileItemWriter {
    fn flush(&mut self) -> OutputResult<()> {
        match self {
            FileItemWriter::Csv(writer) => writer.flush(),
            FileItemWriter::Json(writer) => writer.flush(),
        }
    }

    fn close(self) -> OutputResult<()> {
        match self {
            FileItemWriter::Csv(writer) => writer.close(),
            FileItemWriter::Json(writer) => writer.close(),
        }
    }
}

impl ItemWriter for FileItemWriter {
    fn write_item(&mut self, item: &CollectedItem) -> OutputResult<()> {
        match self {
            FileItemWriter::Csv(writer) => writer.write_item(item),
            FileItemWriter::Json(writer) => writer.write_item(item),
        }
    }

    fn items_written(&self) -> u64 {
        match self {
            FileItemWriter::Csv(writer) => writer.items_written(),
            FileItemWriter::Json(writer) => writer.items_written(),
        }
    }
}
