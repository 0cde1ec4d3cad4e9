//! CSV output writer implementation

use crate::CollectedItem;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{ItemWriter, OutputError, OutputResult, OutputWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Separator for list-valued columns (hashtags, mentions, urls)
const LIST_SEPARATOR: &str = " ";

/// CSV record for a collected post
#[derive(Debug, Serialize)]
struct ItemRecord<'a> {
    query: &'a str,
    post_id: &'a str,
    author: &'a str,
    content: &'a str,
    posted_at: String,
    likes: u64,
    reposts: u64,
    replies: u64,
    hashtags: String,
    mentions: String,
    urls: String,
    is_repost: bool,
    is_reply: bool,
    language: &'a str,
    fingerprint: &'a str,
    accepted_at: String,
}

impl<'a> From<&'a CollectedItem> for ItemRecord<'a> {
    fn from(item: &'a CollectedItem) -> Self {
        let post = &item.post;
        Self {
            query: &item.query,
            post_id: &post.post_id,
            author: &post.author,
            content: &post.content,
            posted_at: post.posted_at.to_rfc3339(),
            likes: post.likes,
            reposts: post.reposts,
            replies: post.replies,
            hashtags: post.hashtags.join(LIST_SEPARATOR),
            mentions: post.mentions.join(LIST_SEPARATOR),
            urls: post.urls.join(LIST_SEPARATOR),
            is_repost: post.is_repost,
            is_reply: post.is_reply,
            language: &post.language,
            fingerprint: item.fingerprint.as_str(),
            accepted_at: item.accepted_at.to_rfc3339(),
        }
    }
}

/// Buffered CSV writer for collected items
pub struct CsvItemWriter {
    writer: Writer<BufWriter<File>>,
    items_written: u64,
}

impl CsvItemWriter {
    /// Create a writer with the default buffer size
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with a custom buffer size, creating parent directories
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);

        // Headers are written by csv::Writer on the first serialize()
        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            items_written: 0,
        })
    }
}

impl ItemWriter for CsvItemWriter {
    fn write_item(&mut self, item: &CollectedItem) -> OutputResult<()> {
        self.writer
            .serialize(ItemRecord::from(item))
            .map_err(|e| OutputError::CsvError(format!("Failed to write item: {}", e)))?;

        self.items_written += 1;
        if self.items_written % 1000 == 0 {
            self.flush()?;
            debug!("Progress: {} items written", self.items_written);
        }
        Ok(())
    }

    fn items_written(&self) -> u64 {
        self.items_written
    }
}

impl OutputWriter for CsvItemWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;
        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed: {} items written", self.items_written);
        Ok(())
    }
}
