//! Collect command implementation

use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::collector::{CollectionExecutor, CollectionReport};
use crate::output::{
    summary_path_for, timestamped_path, FileFormat, FileItemWriter, ItemWriter, OutputError,
    OutputWriter, RunSummary,
};
use crate::query::Query;
use crate::shutdown::SharedShutdown;
use crate::source::{create_source, ContentSource};

use super::{Cli, CliError, OutputFormat};

/// Arguments for a batch collection run
#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Hashtag (`#nifty50`) or keyword query; repeatable
    #[arg(long = "query", short = 'q', required = true)]
    pub queries: Vec<String>,

    /// Posts to keep per query
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_items: Option<u64>,

    /// Page ceiling per query
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_iterations: Option<u64>,

    /// Output file; defaults to a timestamped file in --output-dir
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory for timestamped output files
    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    /// Item file format (csv or json); inferred from --output when omitted
    #[arg(long)]
    pub format: Option<FileFormat>,

    /// Skip writing the run summary
    #[arg(long, default_value_t = false)]
    pub no_summary: bool,
}

impl CollectArgs {
    /// Output file path and format
    pub fn resolve_output(&self) -> (PathBuf, FileFormat) {
        let format = self
            .format
            .or_else(|| self.output.as_deref().and_then(FileFormat::from_path))
            .unwrap_or_default();
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| timestamped_path(&self.output_dir, "posts", format, Utc::now()));
        (path, format)
    }

    /// Execute the collect command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let queries = Query::parse_all(&self.queries)?;

        let mut config = cli.collector_config()?;
        if let Some(max_items) = self.max_items {
            config.collection.max_items_per_query = max_items as usize;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.collection.max_iterations_per_query = max_iterations as usize;
        }
        config.validate().map_err(CliError::ConfigurationError)?;

        let source: Arc<dyn ContentSource> = create_source(&cli.source_kind()?)?.into();
        info!(
            source = source.name(),
            queries = queries.len(),
            "Starting collect command"
        );

        let spinner = (cli.output_format == OutputFormat::Human).then(|| create_spinner(&queries));
        let executor = CollectionExecutor::new(source, config).with_shutdown(shutdown);
        let result = executor.collect(&queries).await;
        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }
        let report = result?;

        let (path, format) = self.resolve_output();
        write_items(&path, format, &report)?;

        let summary = RunSummary::from_items(&report.items);
        let summary_path = if self.no_summary {
            None
        } else {
            let summary_path = summary_path_for(&path);
            summary.write_json(&summary_path)?;
            Some(summary_path)
        };

        match cli.output_format {
            OutputFormat::Json => output_json(&report, &path, summary_path.as_deref())?,
            OutputFormat::Human => output_human(&report, &summary, &path, summary_path.as_deref()),
        }
        Ok(())
    }
}

fn write_items(path: &Path, format: FileFormat, report: &CollectionReport) -> Result<(), CliError> {
    let mut writer = FileItemWriter::create(path, format)?;
    writer.write_items(&report.items)?;
    writer.close()?;
    Ok(())
}

/// Output result as a single JSON line
fn output_json(
    report: &CollectionReport,
    path: &Path,
    summary_path: Option<&Path>,
) -> Result<(), CliError> {
    let output = serde_json::json!({
        "success": true,
        "items": report.items.len(),
        "unique_fingerprints": report.unique_fingerprints,
        "output_path": path.display().to_string(),
        "summary_path": summary_path.map(|p| p.display().to_string()),
        "queries": report.queries,
        "stats": report.stats,
    });
    let line = serde_json::to_string(&output)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    println!("{line}");
    Ok(())
}

/// Output result in human-readable format
fn output_human(
    report: &CollectionReport,
    summary: &RunSummary,
    path: &Path,
    summary_path: Option<&Path>,
) {
    println!("\nCollection completed!");
    println!("Posts collected: {}", report.items.len());
    println!("Output: {}", path.display());
    if let Some(summary_path) = summary_path {
        println!("Summary: {}", summary_path.display());
    }

    println!("\nPer query:");
    for query in &report.queries {
        println!(
            "  {:<24} {:>5} posts  {:>3} pages  ({})",
            query.query,
            query.items,
            query.pages_fetched,
            query.termination.label()
        );
    }

    let stats = &report.stats;
    println!(
        "\nRequests: {} ({} ok, {} failed, {} interrupted)",
        stats.total_requests,
        stats.successful_requests,
        stats.failed_requests,
        stats.interrupted_requests
    );
    println!("Success rate: {:.1}%", stats.success_rate * 100.0);
    println!("Unique authors: {}", summary.unique_authors);
    if !summary.top_hashtags.is_empty() {
        let tags: Vec<String> = summary
            .top_hashtags
            .iter()
            .take(5)
            .map(|(tag, count)| format!("{tag} ({count})"))
            .collect();
        println!("Top hashtags: {}", tags.join(", "));
    }
}

/// Spinner shown while the batch run is in progress
fn create_spinner(queries: &[Query]) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    let names: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
    pb.set_message(format!("Collecting {}", names.join(", ")));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
