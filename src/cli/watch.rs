//! Watch command implementation

use clap::Parser;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::collector::StreamWatcher;
use crate::output::{FileFormat, FileItemWriter, ItemWriter, OutputError, OutputWriter};
use crate::query::Query;
use crate::shutdown::SharedShutdown;
use crate::source::{create_source, ContentSource};
use crate::CollectedItem;

use super::{Cli, CliError, OutputFormat};

/// Characters of post content shown per line in human output
const PREVIEW_CHARS: usize = 100;

/// Arguments for a streaming run
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Hashtag (`#nifty50`) or keyword query; repeatable
    #[arg(long = "query", short = 'q', required = true)]
    pub queries: Vec<String>,

    /// How long to watch, in minutes
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub duration_mins: u64,

    /// Posts per query per cycle
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Also append each post to this file (format from its extension, default csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl WatchArgs {
    /// Execute the watch command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let queries = Query::parse_all(&self.queries)?;

        let mut config = cli.collector_config()?;
        if let Some(batch_size) = self.batch_size {
            config.stream.batch_size = batch_size as usize;
        }
        config.validate().map_err(CliError::ConfigurationError)?;

        let source: Arc<dyn ContentSource> = create_source(&cli.source_kind()?)?.into();
        let duration = Duration::from_secs(self.duration_mins.saturating_mul(60));
        info!(
            source = source.name(),
            queries = queries.len(),
            duration_mins = self.duration_mins,
            "Starting watch command"
        );

        let mut writer = match &self.output {
            Some(path) => {
                let format = FileFormat::from_path(path).unwrap_or_default();
                Some(FileItemWriter::create(path, format)?)
            }
            None => None,
        };

        let mut stream = StreamWatcher::new(source, config)
            .with_shutdown(shutdown)
            .watch(queries, duration);

        let mut count = 0usize;
        while let Some(item) = stream.next().await {
            count += 1;
            if let Some(writer) = writer.as_mut() {
                writer.write_item(&item)?;
                writer.flush()?;
            }
            match cli.output_format {
                OutputFormat::Json => {
                    let line = serde_json::to_string(&item)
                        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
                    println!("{line}");
                }
                OutputFormat::Human => println!("{}", format_item(&item)),
            }
        }

        if let Some(writer) = writer {
            writer.close()?;
        }

        if cli.output_format == OutputFormat::Human {
            println!("\nWatch finished: {count} posts");
        }
        info!(items = count, "Watch command finished");
        Ok(())
    }
}

/// One-line human rendering of a post
fn format_item(item: &CollectedItem) -> String {
    let mut preview: String = item
        .post
        .content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if preview.chars().count() > PREVIEW_CHARS {
        preview = preview.chars().take(PREVIEW_CHARS).collect::<String>() + "...";
    }
    format!(
        "[{}] {} @{}: {} (likes {}, reposts {})",
        item.post.posted_at.format("%H:%M"),
        item.query,
        item.post.author,
        preview,
        item.post.likes,
        item.post.reposts
    )
}
