//! JSON array output writer

use crate::CollectedItem;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{ItemWriter, OutputError, OutputResult, OutputWriter};

/// Streams items into a pretty-printed JSON array
pub struct JsonItemWriter {
    writer: BufWriter<File>,
    items_written: u64,
}

impl JsonItemWriter {
    /// Create a writer, creating parent directories
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating JSON writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(b"[")
            .map_err(|e| OutputError::IoError(e.to_string()))?;

        Ok(Self {
            writer,
            items_written: 0,
        })
    }
}

impl ItemWriter for JsonItemWriter {
    fn write_item(&mut self, item: &CollectedItem) -> OutputResult<()> {
        let separator: &[u8] = if self.items_written == 0 { b"\n  " } else { b",\n  " };
        self.writer
            .write_all(separator)
            .map_err(|e| OutputError::IoError(e.to_string()))?;
        serde_json::to_writer(&mut self.writer, item)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        self.items_written += 1;
        Ok(())
    }

    fn items_written(&self) -> u64 {
        self.items_written
    }
}

impl OutputWriter for JsonItemWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        let closing: &[u8] = if self.items_written == 0 { b"]\n" } else { b"\n]\n" };
        self.writer
            .write_all(closing)
            .map_err(|e| OutputError::IoError(e.to_string()))?;
        self.flush()?;

        let file = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("JSON writer closed: {} items written", self.items_written);
        Ok(())
    }
}
