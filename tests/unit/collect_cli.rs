//! Unit tests for CLI argument parsing

use clap::Parser;
use std::io::Write;
use std::time::Duration;

use social_collector::cli::{Cli, Commands, OutputFormat};
use social_collector::collector::config::MAX_TIME_WINDOW_HOURS;
use social_collector::collector::IdentityStrategy;
use social_collector::source::SourceKind;

#[test]
fn test_collect_defaults() {
    let cli = Cli::parse_from(["social-collector", "--mock", "collect", "-q", "#nifty50"]);

    assert_eq!(cli.output_format, OutputFormat::Human);
    assert!(matches!(cli.source_kind().unwrap(), SourceKind::Mock(_)));

    let config = cli.collector_config().unwrap();
    assert_eq!(config.rate.base_delay, Duration::from_secs(2));
    assert_eq!(config.collection.max_items_per_query, 100);

    match cli.command {
        Commands::Collect(args) => {
            assert_eq!(args.queries, vec!["#nifty50"]);
            assert_eq!(args.max_items, None);
            assert!(!args.no_summary);
        }
        Commands::Watch(_) => panic!("expected collect"),
    }
}

#[test]
fn test_global_flags_override_config() {
    let cli = Cli::parse_from([
        "social-collector",
        "collect",
        "--query",
        "sensex",
        "--query",
        "#banknifty",
        "--mock",
        "--base-delay",
        "0.5",
        "--max-delay",
        "20",
        "--rpm",
        "12",
        "--no-backoff",
        "--identity-strategy",
        "round-robin",
        "--time-window-hours",
        "6",
        "--seed",
        "99",
        "--output-format",
        "json",
    ]);

    let config = cli.collector_config().unwrap();
    assert_eq!(config.rate.base_delay, Duration::from_millis(500));
    assert_eq!(config.rate.max_delay, Duration::from_secs(20));
    assert_eq!(config.rate.requests_per_minute, 12);
    assert!(!config.rate.exponential_backoff);
    assert_eq!(config.identity.strategy, IdentityStrategy::RoundRobin);
    assert_eq!(config.collection.time_window_hours, 6);
    assert_eq!(config.seed, Some(99));
    assert_eq!(cli.output_format, OutputFormat::Json);

    match cli.source_kind().unwrap() {
        SourceKind::Mock(mock) => assert_eq!(mock.seed, 99),
        other => panic!("expected mock source, got {other:?}"),
    }
}

#[test]
fn test_config_file_then_flags() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"rate": {{"requests_per_minute": 5}}, "stream": {{"batch_size": 3}}, "seed": 4}}"#
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let cli = Cli::parse_from([
        "social-collector",
        "--config",
        path.as_str(),
        "--rpm",
        "8",
        "--mock",
        "watch",
        "-q",
        "#nifty50",
    ]);
    let config = cli.collector_config().unwrap();

    assert_eq!(config.rate.requests_per_minute, 8);
    assert_eq!(config.stream.batch_size, 3);
    assert_eq!(config.seed, Some(4));
    assert_eq!(config.rate.max_delay, Duration::from_secs(60));
}

#[test]
fn test_watch_arguments() {
    let cli = Cli::parse_from([
        "social-collector",
        "--source-url",
        "http://localhost:8080/search",
        "watch",
        "-q",
        "#nifty50",
        "--duration-mins",
        "5",
        "--batch-size",
        "4",
    ]);

    assert_eq!(
        cli.source_kind().unwrap(),
        SourceKind::http("http://localhost:8080/search")
    );
    match cli.command {
        Commands::Watch(args) => {
            assert_eq!(args.duration_mins, 5);
            assert_eq!(args.batch_size, Some(4));
            assert!(args.output.is_none());
        }
        Commands::Collect(_) => panic!("expected watch"),
    }
}

#[test]
fn test_invalid_arguments_rejected() {
    // A query is mandatory
    assert!(Cli::try_parse_from(["social-collector", "--mock", "collect"]).is_err());
    // Mock and URL are mutually exclusive
    assert!(Cli::try_parse_from([
        "social-collector",
        "--mock",
        "--source-url",
        "http://x",
        "collect",
        "-q",
        "a"
    ])
    .is_err());
    assert!(
        Cli::try_parse_from(["social-collector", "collect", "-q", "a", "--rpm", "0"]).is_err()
    );
    assert!(Cli::try_parse_from([
        "social-collector",
        "collect",
        "-q",
        "a",
        "--identity-strategy",
        "sticky"
    ])
    .is_err());
    assert!(
        Cli::try_parse_from(["social-collector", "collect", "-q", "a", "--base-delay", "-1"])
            .is_err()
    );
}

#[test]
fn test_time_window_bounds() {
    let args = |hours: &str| {
        Cli::try_parse_from([
            "social-collector",
            "collect",
            "-q",
            "a",
            "--time-window-hours",
            hours,
        ])
    };
    let max = MAX_TIME_WINDOW_HOURS.to_string();
    assert_eq!(
        args(&max).unwrap().time_window_hours,
        Some(MAX_TIME_WINDOW_HOURS)
    );
    assert!(args("0").is_err());
    assert!(args(&(MAX_TIME_WINDOW_HOURS + 1).to_string()).is_err());
    assert!(args(&u32::MAX.to_string()).is_err());
}

#[test]
fn test_source_required() {
    let cli = Cli::parse_from(["social-collector", "collect", "-q", "#nifty50"]);
    assert!(cli.source_kind().is_err());
}
