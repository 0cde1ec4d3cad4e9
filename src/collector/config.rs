//! Collection configuration constants and settings

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::random::RandomSource;

/// Number of outcomes kept in the rolling request history.
pub const HISTORY_CAPACITY: usize = 1000;

/// Window used for the requests-per-minute check.
pub const TRAILING_WINDOW: Duration = Duration::from_secs(60);

/// Lower bound of the backoff multiplier.
pub const MIN_BACKOFF_MULTIPLIER: f64 = 1.0;

/// Upper bound of the backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Multiplier decay applied on every success.
pub const SUCCESS_DECAY: f64 = 0.9;

/// Multiplier growth applied on every failure.
pub const FAILURE_GROWTH: f64 = 1.5;

/// Lower bound of the jitter factor applied to every delay.
pub const JITTER_MIN: f64 = 0.5;

/// Upper bound of the jitter factor applied to every delay.
pub const JITTER_MAX: f64 = 1.5;

/// Default delay between requests.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default ceiling for any single wait (backoff and jitter included).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default request budget per trailing minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 30;

/// Default number of posts to keep per query in batch mode.
pub const DEFAULT_MAX_ITEMS_PER_QUERY: usize = 100;

/// Default page/scroll ceiling per query. Guarantees termination when the
/// source keeps returning already-seen content.
pub const DEFAULT_MAX_ITERATIONS_PER_QUERY: usize = 10;

/// Default lookback for accepted posts.
pub const DEFAULT_TIME_WINDOW_HOURS: u32 = 24;

/// Largest accepted lookback, ten years.
pub const MAX_TIME_WINDOW_HOURS: u32 = 24 * 365 * 10;

/// Default batch size per query per streaming cycle.
pub const DEFAULT_STREAM_BATCH_SIZE: usize = 10;

/// Default cool-down after a failed query in streaming mode.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(60);

/// Probability of sending `Cache-Control: max-age=0`.
pub const DEFAULT_CACHE_CONTROL_PROBABILITY: f64 = 0.5;

/// Probability of sending `DNT: 1`.
pub const DEFAULT_DNT_PROBABILITY: f64 = 0.3;

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Growth curve used while consecutive failures are non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffCurve {
    /// `base * 2^consecutive_failures`
    #[default]
    Exponential,
    /// `base * backoff_multiplier`
    Multiplier,
}

/// Identity selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Uniformly random profile per request
    #[default]
    Random,
    /// Cycle through the pool in order
    RoundRobin,
}

/// Inclusive range of durations sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound
    #[serde(with = "duration_secs")]
    pub min: Duration,
    /// Upper bound
    #[serde(with = "duration_secs")]
    pub max: Duration,
}

impl DelayRange {
    /// Range between two bounds
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Degenerate range that always yields `value`
    pub const fn fixed(value: Duration) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Draw a duration from the range
    pub fn sample(&self, rng: &mut RandomSource) -> Duration {
        rng.duration_between(self.min, self.max)
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!(
                "{name}: min ({:?}) must not exceed max ({:?})",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Pacing and backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Delay between requests when no failures are pending
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    /// Ceiling for any computed delay
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// Request budget per trailing 60 seconds
    pub requests_per_minute: u32,
    /// Grow the delay on consecutive failures
    pub exponential_backoff: bool,
    /// Shape of that growth
    pub backoff_curve: BackoffCurve,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            exponential_backoff: true,
            backoff_curve: BackoffCurve::Exponential,
        }
    }
}

impl RateLimitConfig {
    /// Validate rate settings
    pub fn validate(&self) -> Result<(), String> {
        if self.max_delay.is_zero() {
            return Err("max_delay must be positive".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err(format!(
                "base_delay ({:?}) must not exceed max_delay ({:?})",
                self.base_delay, self.max_delay
            ));
        }
        if self.requests_per_minute == 0 {
            return Err("requests_per_minute must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Identity pool and header randomization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User-agent pool; the built-in pool is used when empty
    pub user_agents: Vec<String>,
    /// Selection strategy
    pub strategy: IdentityStrategy,
    /// Probability of adding `Cache-Control`
    pub cache_control_probability: f64,
    /// Probability of adding `DNT`
    pub dnt_probability: f64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agents: Vec::new(),
            strategy: IdentityStrategy::Random,
            cache_control_probability: DEFAULT_CACHE_CONTROL_PROBABILITY,
            dnt_probability: DEFAULT_DNT_PROBABILITY,
        }
    }
}

impl IdentityConfig {
    /// Validate identity settings
    pub fn validate(&self) -> Result<(), String> {
        for (name, p) in [
            ("cache_control_probability", self.cache_control_probability),
            ("dnt_probability", self.dnt_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if self.user_agents.iter().any(|ua| ua.trim().is_empty()) {
            return Err("user_agents must not contain empty entries".to_string());
        }
        Ok(())
    }
}

/// Per-query collection limits and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Accept only posts newer than this many hours
    pub time_window_hours: u32,
    /// Target number of posts per query
    pub max_items_per_query: usize,
    /// Page/scroll ceiling per query
    pub max_iterations_per_query: usize,
    /// Randomized pause between pages of one query
    pub think_time: DelayRange,
    /// Randomized pause between queries in batch mode
    pub query_pause: DelayRange,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            time_window_hours: DEFAULT_TIME_WINDOW_HOURS,
            max_items_per_query: DEFAULT_MAX_ITEMS_PER_QUERY,
            max_iterations_per_query: DEFAULT_MAX_ITERATIONS_PER_QUERY,
            think_time: DelayRange::new(Duration::from_secs(2), Duration::from_secs(4)),
            query_pause: DelayRange::new(Duration::from_secs(3), Duration::from_secs(6)),
        }
    }
}

impl CollectionConfig {
    /// Validate collection settings
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_TIME_WINDOW_HOURS).contains(&self.time_window_hours) {
            return Err(format!(
                "time_window_hours must be within [1, {MAX_TIME_WINDOW_HOURS}], got {}",
                self.time_window_hours
            ));
        }
        if self.max_items_per_query == 0 {
            return Err("max_items_per_query must be at least 1".to_string());
        }
        if self.max_iterations_per_query == 0 {
            return Err("max_iterations_per_query must be at least 1".to_string());
        }
        self.think_time.validate("think_time")?;
        self.query_pause.validate("query_pause")
    }
}

/// Streaming-mode pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Posts requested per query per cycle
    pub batch_size: usize,
    /// Pause between batches
    pub pacing: DelayRange,
    /// Pause after a failed batch
    #[serde(with = "duration_secs")]
    pub cool_down: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_STREAM_BATCH_SIZE,
            pacing: DelayRange::new(Duration::from_secs(30), Duration::from_secs(60)),
            cool_down: DEFAULT_COOL_DOWN,
        }
    }
}

impl StreamConfig {
    /// Validate streaming settings
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        self.pacing.validate("pacing")?;
        if self.cool_down < self.pacing.min {
            return Err(format!(
                "cool_down ({:?}) must be at least the minimum pacing interval ({:?})",
                self.cool_down, self.pacing.min
            ));
        }
        Ok(())
    }
}

/// Complete collector configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Pacing and backoff
    pub rate: RateLimitConfig,
    /// Identity rotation
    pub identity: IdentityConfig,
    /// Per-query limits
    pub collection: CollectionConfig,
    /// Streaming mode
    pub stream: StreamConfig,
    /// Seed for all randomness; entropy when unset
    pub seed: Option<u64>,
}

impl CollectorConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        serde_json::from_str(&raw)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.rate.validate()?;
        self.identity.validate()?;
        self.collection.validate()?;
        self.stream.validate()
    }
}
