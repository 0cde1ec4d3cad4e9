//! CLI command implementations

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::collector::config::MAX_TIME_WINDOW_HOURS;
use crate::collector::{CollectorConfig, IdentityStrategy};
use crate::source::{MockSourceConfig, SourceKind};

pub mod collect;
pub mod error;
pub mod watch;

pub use collect::CollectArgs;
pub use error::CliError;
pub use watch::WatchArgs;

/// Parse a non-negative number of seconds
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{s}': {e}"))
}

/// Parse an identity strategy (`random` or `round-robin`)
fn parse_identity_strategy(s: &str) -> Result<IdentityStrategy, String> {
    match s.to_lowercase().as_str() {
        "random" => Ok(IdentityStrategy::Random),
        "round-robin" | "round_robin" | "roundrobin" => Ok(IdentityStrategy::RoundRobin),
        _ => Err(format!(
            "Invalid identity strategy: {s}. Valid options: random, round-robin"
        )),
    }
}

/// Social media post collector CLI
#[derive(Parser, Debug)]
#[command(name = "social-collector")]
#[command(about = "Collect social media posts for topic queries with adaptive pacing", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// JSON configuration file; flags below override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the synthetic source instead of a remote endpoint
    #[arg(long, global = true, default_value_t = false, conflicts_with = "source_url")]
    pub mock: bool,

    /// Search endpoint URL of a JSON-over-HTTP source
    #[arg(long, global = true)]
    pub source_url: Option<String>,

    /// Seed for delays, identities and synthetic content
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Base delay between requests, in seconds
    #[arg(long, global = true, value_parser = parse_seconds)]
    pub base_delay: Option<Duration>,

    /// Maximum delay between requests, in seconds
    #[arg(long, global = true, value_parser = parse_seconds)]
    pub max_delay: Option<Duration>,

    /// Request budget per trailing minute
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub rpm: Option<u32>,

    /// Disable backoff growth on consecutive failures
    #[arg(long, global = true, default_value_t = false)]
    pub no_backoff: bool,

    /// Identity selection: random or round-robin
    #[arg(long, global = true, value_parser = parse_identity_strategy)]
    pub identity_strategy: Option<IdentityStrategy>,

    /// Accept only posts from the last N hours
    #[arg(
        long,
        global = true,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TIME_WINDOW_HOURS as i64)
    )]
    pub time_window_hours: Option<u32>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Build the collector configuration: defaults, then `--config`, then flags
    pub fn collector_config(&self) -> Result<CollectorConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                CollectorConfig::from_json_file(path).map_err(CliError::ConfigurationError)?
            }
            None => CollectorConfig::default(),
        };

        if let Some(base_delay) = self.base_delay {
            config.rate.base_delay = base_delay;
        }
        if let Some(max_delay) = self.max_delay {
            config.rate.max_delay = max_delay;
        }
        if let Some(rpm) = self.rpm {
            config.rate.requests_per_minute = rpm;
        }
        if self.no_backoff {
            config.rate.exponential_backoff = false;
        }
        if let Some(strategy) = self.identity_strategy {
            config.identity.strategy = strategy;
        }
        if let Some(hours) = self.time_window_hours {
            config.collection.time_window_hours = hours;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        Ok(config)
    }

    /// Source selected by `--mock` / `--source-url`
    pub fn source_kind(&self) -> Result<SourceKind, CliError> {
        if self.mock {
            let mut mock = MockSourceConfig::default();
            if let Some(seed) = self.seed {
                mock.seed = seed;
            }
            return Ok(SourceKind::Mock(mock));
        }
        match &self.source_url {
            Some(url) => Ok(SourceKind::http(url.clone())),
            None => Err(CliError::InvalidArgument(
                "a source is required: pass --mock or --source-url <URL>".to_string(),
            )),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect posts for each query once and write them to a file
    Collect(CollectArgs),

    /// Stream posts for the given queries until a deadline
    Watch(WatchArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
