//! Integration tests for item files and run summaries

use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;

use social_collector::cli::{Cli, Commands};
use social_collector::output::{
    summary_path_for, FileFormat, FileItemWriter, ItemWriter, OutputWriter, RunSummary,
};
use social_collector::query::Query;
use social_collector::shutdown::ShutdownCoordinator;
use social_collector::{CandidateItem, CollectedItem, Post};

fn item(query: &str, n: u64, tags: &[&str]) -> CollectedItem {
    let content = format!("note {n}, with a comma and \"quotes\" {}", tags.join(" "));
    let post = Post {
        post_id: n.to_string(),
        author: format!("author{}", n % 2),
        content,
        posted_at: Utc::now(),
        likes: n * 10,
        reposts: 0,
        replies: 0,
        hashtags: tags.iter().map(|t| t.to_string()).collect(),
        mentions: vec![],
        urls: vec![],
        is_repost: n == 0,
        is_reply: false,
        language: "en".to_string(),
    };
    CollectedItem::accept(&Query::parse(query).unwrap(), CandidateItem::new(post))
}

async fn run_cli(args: &[&str]) {
    let cli = Cli::parse_from(args);
    let shutdown = ShutdownCoordinator::shared();
    match &cli.command {
        Commands::Collect(collect) => collect.execute(&cli, shutdown).await.unwrap(),
        Commands::Watch(watch) => watch.execute(&cli, shutdown).await.unwrap(),
    }
}

fn csv_rows(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let rows = reader.records().map(|r| r.unwrap()).collect();
    (headers, rows)
}

#[test]
fn test_csv_writer_escapes_and_joins_lists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/posts.csv");
    let items = vec![item("#nifty50", 1, &["#nifty50", "#markets"]), item("sensex", 2, &[])];

    let mut writer = FileItemWriter::create(&path, FileFormat::Csv).unwrap();
    writer.write_items(&items).unwrap();
    assert_eq!(writer.items_written(), 2);
    writer.close().unwrap();

    let (headers, rows) = csv_rows(&path);
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][column("hashtags")], "#nifty50 #markets");
    assert_eq!(&rows[0][column("content")], items[0].post.content);
    assert_eq!(&rows[1][column("query")], "sensex");
    assert_eq!(&rows[1][column("fingerprint")], items[1].fingerprint.as_str());
}

#[test]
fn test_json_writer_round_trips_items() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("posts.json");
    let items = vec![item("#nifty50", 1, &["#nifty50"]), item("#nifty50", 2, &[])];

    let mut writer = FileItemWriter::create(&path, FileFormat::Json).unwrap();
    writer.write_items(&items).unwrap();
    writer.close().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<CollectedItem> = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, items);
}

#[test]
fn test_empty_json_file_is_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.json");
    FileItemWriter::create(&path, FileFormat::Json)
        .unwrap()
        .close()
        .unwrap();

    let parsed: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(parsed.is_empty());
}

#[test]
fn test_run_summary_contents() {
    let items = vec![
        item("#nifty50", 0, &["#Nifty50", "#markets"]),
        item("#nifty50", 1, &["#nifty50"]),
        item("sensex", 2, &["#markets"]),
    ];
    let summary = RunSummary::from_items(&items);

    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.unique_authors, 2);
    assert_eq!(summary.distinct_hashtags, 2);
    assert_eq!(summary.top_hashtags[0], ("#markets".to_string(), 2));
    assert_eq!(summary.per_query.get("#nifty50"), Some(&2));
    assert_eq!(summary.languages.get("en"), Some(&3));
    assert!((summary.avg_likes - 10.0).abs() < f64::EPSILON);
    assert!((summary.repost_ratio - 1.0 / 3.0).abs() < 1e-9);
    assert!(summary.earliest_post <= summary.latest_post);

    let dir = tempdir().unwrap();
    let path = dir.path().join("summary.json");
    summary.write_json(&path).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["total_items"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_collect_command_writes_items_and_summary() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("run.json");
    let output_str = output.to_str().unwrap();

    run_cli(&[
        "social-collector",
        "--mock",
        "--seed",
        "3",
        "--output-format",
        "json",
        "collect",
        "-q",
        "#nifty50",
        "-q",
        "sensex",
        "--max-items",
        "12",
        "--output",
        output_str,
    ])
    .await;

    let items: Vec<CollectedItem> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(items.len(), 24);

    let summary: Value =
        serde_json::from_str(&std::fs::read_to_string(summary_path_for(&output)).unwrap())
            .unwrap();
    assert_eq!(summary["total_items"], 24);
    assert_eq!(summary["per_query"]["#nifty50"], 12);
    assert_eq!(summary["per_query"]["sensex"], 12);
}

#[tokio::test(start_paused = true)]
async fn test_collect_command_default_csv_in_output_dir() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("data");

    run_cli(&[
        "social-collector",
        "--mock",
        "--output-format",
        "json",
        "collect",
        "-q",
        "#banknifty",
        "--max-iterations",
        "2",
        "--output-dir",
        output_dir.to_str().unwrap(),
        "--no-summary",
    ])
    .await;

    let files: Vec<_> = std::fs::read_dir(&output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().and_then(|e| e.to_str()), Some("csv"));

    let (_, rows) = csv_rows(&files[0]);
    assert_eq!(rows.len(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_watch_command_appends_to_file() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("stream.csv");

    run_cli(&[
        "social-collector",
        "--mock",
        "--seed",
        "9",
        "--output-format",
        "json",
        "watch",
        "-q",
        "#nifty50",
        "--duration-mins",
        "1",
        "--batch-size",
        "4",
        "--output",
        output.to_str().unwrap(),
    ])
    .await;

    let (_, rows) = csv_rows(&output);
    assert!(rows.len() >= 4, "expected at least one batch, got {}", rows.len());
    assert_eq!(rows.len() % 4, 0);
}
