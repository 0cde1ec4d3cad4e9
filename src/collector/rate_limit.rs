//! Adaptive request pacing with backoff and jitter
//!
//! [`RateController`] decides how long to wait before the next request. The
//! delay starts at the configured base, grows while requests keep failing,
//! and is always multiplied by a random jitter factor before being capped at
//! the configured maximum. Every request outcome lands in a bounded
//! [`RollingHistory`] from which [`RateStats`] are derived.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, Span};

use crate::collector::config::{
    duration_secs, BackoffCurve, RateLimitConfig, FAILURE_GROWTH, HISTORY_CAPACITY, JITTER_MAX,
    JITTER_MIN, MAX_BACKOFF_MULTIPLIER, MIN_BACKOFF_MULTIPLIER, SUCCESS_DECAY, TRAILING_WINDOW,
};
use crate::random::RandomSource;
use crate::shutdown::StopSignal;

/// Exponent cap for `2^n`; far beyond any realistic max delay.
const MAX_BACKOFF_EXPONENT: u32 = 64;

/// One recorded request outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Wall-clock time of the record
    pub timestamp: DateTime<Utc>,
    /// User agent of the identity that issued the request
    pub identity: String,
    /// Whether the request succeeded
    pub success: bool,
    /// Measured request latency
    pub latency: Duration,
    /// Monotonic time of the record, used for the trailing window
    pub recorded_at: Instant,
}

/// Fixed-capacity FIFO of the most recent outcomes
#[derive(Debug, Clone)]
pub struct RollingHistory {
    outcomes: VecDeque<Outcome>,
    capacity: usize,
}

impl RollingHistory {
    /// Empty history holding at most `capacity` outcomes
    pub fn new(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, outcome: Outcome) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
    }

    fn clear(&mut self) {
        self.outcomes.clear();
    }

    /// Number of retained outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no outcome has been retained
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Maximum number of retained outcomes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained outcome
    pub fn oldest(&self) -> Option<&Outcome> {
        self.outcomes.front()
    }

    /// Retained outcomes, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Outcome> + '_ {
        self.outcomes.iter()
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// Failure streak and multiplier driving the backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Adaptive multiplier, always within `[1.0, 10.0]`
    pub backoff_multiplier: f64,
    /// Monotonic time of the last recorded outcome
    pub last_request_time: Option<Instant>,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            backoff_multiplier: MIN_BACKOFF_MULTIPLIER,
            last_request_time: None,
        }
    }
}

/// Read-only snapshot of the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateStats {
    /// Outcomes in the rolling history
    pub total_requests: usize,
    /// Share of successful outcomes (0.0 when empty)
    pub success_rate: f64,
    /// Mean latency over the history
    #[serde(with = "duration_secs")]
    pub avg_latency: Duration,
    /// Outcomes recorded in the last 60 seconds
    pub requests_in_trailing_60s: usize,
    /// Current failure streak
    pub consecutive_failures: u32,
    /// Current backoff multiplier
    pub backoff_multiplier: f64,
}

/// Computes inter-request delays and tracks request outcomes
///
/// # Examples
///
/// ```
/// use social_collector::collector::{RateController, RateLimitConfig};
/// use social_collector::random::RandomSource;
/// use std::time::Duration;
///
/// let mut controller = RateController::new(RateLimitConfig::default(), RandomSource::from_seed(1));
/// for _ in 0..3 {
///     controller.record_outcome(false, Duration::from_millis(100), "ua");
/// }
/// assert_eq!(controller.pre_jitter_delay(), Duration::from_secs(16));
/// ```
#[derive(Debug)]
pub struct RateController {
    config: RateLimitConfig,
    history: RollingHistory,
    state: BackoffState,
    rng: RandomSource,
    span: Span,
}

impl RateController {
    /// Create a controller with an empty history
    pub fn new(config: RateLimitConfig, rng: RandomSource) -> Self {
        Self {
            config,
            history: RollingHistory::default(),
            state: BackoffState::default(),
            rng,
            span: Span::none(),
        }
    }

    /// Emit events under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Delay before jitter: base, or the backoff curve capped at `max_delay`
    pub fn pre_jitter_delay(&self) -> Duration {
        let base = self.config.base_delay.as_secs_f64();
        let max = self.config.max_delay.as_secs_f64();

        let delay = if self.config.exponential_backoff && self.state.consecutive_failures > 0 {
            let grown = match self.config.backoff_curve {
                BackoffCurve::Exponential => {
                    let exponent = self.state.consecutive_failures.min(MAX_BACKOFF_EXPONENT);
                    base * 2f64.powi(exponent as i32)
                }
                BackoffCurve::Multiplier => base * self.state.backoff_multiplier,
            };
            base.max(grown.min(max))
        } else {
            base
        };

        Duration::from_secs_f64(delay)
    }

    /// Draw the next delay: pre-jitter delay times `U(0.5, 1.5)`, capped at `max_delay`
    pub fn calculate_delay(&mut self) -> Duration {
        let jitter = self.rng.uniform(JITTER_MIN, JITTER_MAX);
        let jittered = self.pre_jitter_delay().as_secs_f64() * jitter;
        Duration::from_secs_f64(jittered.min(self.config.max_delay.as_secs_f64()))
    }

    /// Whether less than a freshly drawn delay has passed since the last request
    pub fn should_wait(&mut self) -> bool {
        self.pending_wait().is_some()
    }

    /// The delay to sleep before the next request, if one is due
    pub fn pending_wait(&mut self) -> Option<Duration> {
        let last = self.state.last_request_time?;
        let delay = self.calculate_delay();
        (last.elapsed() < delay).then_some(delay)
    }

    /// Sleep for a freshly drawn delay if one is due; returns the time slept
    pub async fn wait_if_needed(&mut self) -> Duration {
        self.wait_if_needed_until(&StopSignal::new())
            .await
            .unwrap_or(Duration::ZERO)
    }

    /// Like [`wait_if_needed`](Self::wait_if_needed), but cut short by `stop`
    ///
    /// Returns `None` when the signal fires before or during the wait.
    pub async fn wait_if_needed_until(&mut self, stop: &StopSignal) -> Option<Duration> {
        match self.pending_wait() {
            Some(delay) => {
                debug!(
                    parent: &self.span,
                    delay_ms = delay.as_millis() as u64,
                    consecutive_failures = self.state.consecutive_failures,
                    "Rate limiting: waiting before next request"
                );
                crate::metrics::record_rate_wait(delay);
                stop.pause(delay).await.then_some(delay)
            }
            None => (!stop.is_triggered()).then_some(Duration::ZERO),
        }
    }

    /// Record a request outcome and update the backoff state
    pub fn record_outcome(&mut self, success: bool, latency: Duration, identity: &str) {
        let now = Instant::now();
        self.history.push(Outcome {
            timestamp: Utc::now(),
            identity: identity.to_string(),
            success,
            latency,
            recorded_at: now,
        });
        self.state.last_request_time = Some(now);

        if success {
            self.state.consecutive_failures = 0;
            self.state.backoff_multiplier =
                (self.state.backoff_multiplier * SUCCESS_DECAY).max(MIN_BACKOFF_MULTIPLIER);
        } else {
            self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
            self.state.backoff_multiplier =
                (self.state.backoff_multiplier * FAILURE_GROWTH).min(MAX_BACKOFF_MULTIPLIER);
            debug!(
                parent: &self.span,
                consecutive_failures = self.state.consecutive_failures,
                backoff_multiplier = self.state.backoff_multiplier,
                "Request failed, backing off"
            );
        }

        crate::metrics::record_backoff(self.state.backoff_multiplier);
    }

    /// Derive statistics from the rolling history
    pub fn stats(&self) -> RateStats {
        let total = self.history.len();
        let successes = self.history.iter().filter(|o| o.success).count();
        let latency_sum: Duration = self.history.iter().map(|o| o.latency).sum();

        let (success_rate, avg_latency) = if total == 0 {
            (0.0, Duration::ZERO)
        } else {
            (
                successes as f64 / total as f64,
                latency_sum / total as u32,
            )
        };

        RateStats {
            total_requests: total,
            success_rate,
            avg_latency,
            requests_in_trailing_60s: self.requests_in_trailing_window(),
            consecutive_failures: self.state.consecutive_failures,
            backoff_multiplier: self.state.backoff_multiplier,
        }
    }

    fn requests_in_trailing_window(&self) -> usize {
        let now = Instant::now();
        self.history
            .iter()
            .rev()
            .take_while(|o| now.saturating_duration_since(o.recorded_at) <= TRAILING_WINDOW)
            .count()
    }

    /// Whether the trailing-minute request count has reached the budget
    pub fn is_rate_limited(&self) -> bool {
        self.requests_in_trailing_window() >= self.config.requests_per_minute as usize
    }

    /// Clear the history and backoff state
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = BackoffState::default();
    }

    /// Current backoff state
    pub fn backoff_state(&self) -> &BackoffState {
        &self.state
    }

    /// Rolling outcome history
    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    /// Active configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
