//! Request session: pacing and identity around a single fetch operation

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn, Span};

use crate::collector::config::duration_secs;
use crate::collector::identity::{Identity, IdentityRotator};
use crate::collector::rate_limit::{RateController, RateStats};
use crate::shutdown::StopSignal;
use crate::source::FetchError;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The fetch operation failed; the failure was recorded
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Deadline or shutdown fired before the request was issued
    #[error("request interrupted before it was issued")]
    Interrupted,
}

/// Session counters merged with the rate controller snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    /// Session start time
    pub started_at: DateTime<Utc>,
    /// Time since the session started
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Calls to `execute`
    pub total_requests: u64,
    /// Operations that succeeded
    pub successful_requests: u64,
    /// Operations that failed
    pub failed_requests: u64,
    /// Calls cut short before the operation ran
    pub interrupted_requests: u64,
    /// Successes over completed operations
    pub success_rate: f64,
    /// Completed operations per second of session time
    pub requests_per_second: f64,
    /// Rate controller snapshot
    pub rate: RateStats,
}

/// Wraps fetch operations with rate limiting, identity rotation and outcome tracking
///
/// A session logs its final statistics exactly once, either through
/// [`RequestSession::finish`] or when dropped.
#[derive(Debug)]
pub struct RequestSession {
    rate: RateController,
    identities: IdentityRotator,
    stop: StopSignal,
    span: Span,
    started_at: DateTime<Utc>,
    started: Instant,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    interrupted_requests: u64,
    finalized: bool,
}

impl RequestSession {
    /// Create a session
    pub fn new(rate: RateController, identities: IdentityRotator) -> Self {
        Self {
            rate,
            identities,
            stop: StopSignal::new(),
            span: Span::none(),
            started_at: Utc::now(),
            started: Instant::now(),
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            interrupted_requests: 0,
            finalized: false,
        }
    }

    /// Make rate waits preemptible by `stop`
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Emit events under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run `op` with a fresh identity once the rate controller allows it
    ///
    /// The outcome is recorded before returning, and a failure is always
    /// propagated as [`SessionError::Fetch`]. When the stop signal fires
    /// during the wait, `op` is not invoked and no outcome is recorded.
    pub async fn execute<T, F, Fut>(&mut self, op: F) -> Result<T, SessionError>
    where
        F: FnOnce(Identity) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.total_requests += 1;
        let identity = self.identities.next_identity();

        if self.rate.wait_if_needed_until(&self.stop).await.is_none() {
            return Err(self.interrupt());
        }

        if self.rate.is_rate_limited() {
            debug!(
                parent: &self.span,
                requests_in_window = self.rate.stats().requests_in_trailing_60s,
                "Request budget for the trailing minute is exhausted"
            );
        }

        let user_agent = identity.user_agent.clone();
        let started = Instant::now();
        let result = op(identity).await;
        let latency = started.elapsed();

        match result {
            Ok(value) => {
                self.rate.record_outcome(true, latency, &user_agent);
                self.successful_requests += 1;
                crate::metrics::record_request("success", latency);
                Ok(value)
            }
            Err(error) => {
                self.rate.record_outcome(false, latency, &user_agent);
                self.failed_requests += 1;
                crate::metrics::record_request("failure", latency);
                warn!(
                    parent: &self.span,
                    error = %error,
                    consecutive_failures = self.rate.backoff_state().consecutive_failures,
                    "Request failed"
                );
                Err(SessionError::Fetch(error))
            }
        }
    }

    fn interrupt(&mut self) -> SessionError {
        self.interrupted_requests += 1;
        debug!(parent: &self.span, "Request interrupted by stop signal");
        SessionError::Interrupted
    }

    /// Current statistics
    pub fn session_stats(&self) -> SessionStats {
        let duration = self.started.elapsed();
        let completed = self.successful_requests + self.failed_requests;
        let success_rate = if completed == 0 {
            0.0
        } else {
            self.successful_requests as f64 / completed as f64
        };
        let requests_per_second = if duration.is_zero() {
            0.0
        } else {
            completed as f64 / duration.as_secs_f64()
        };

        SessionStats {
            started_at: self.started_at,
            duration,
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            interrupted_requests: self.interrupted_requests,
            success_rate,
            requests_per_second,
            rate: self.rate.stats(),
        }
    }

    /// Stop signal bounding this session
    pub fn stop(&self) -> &StopSignal {
        &self.stop
    }

    /// Underlying rate controller
    pub fn rate_controller(&self) -> &RateController {
        &self.rate
    }

    /// Finalize the session and return its final statistics
    pub fn finish(mut self) -> SessionStats {
        let stats = self.session_stats();
        self.log_final(&stats);
        stats
    }

    fn log_final(&mut self, stats: &SessionStats) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        info!(
            parent: &self.span,
            total_requests = stats.total_requests,
            successful = stats.successful_requests,
            failed = stats.failed_requests,
            interrupted = stats.interrupted_requests,
            success_rate = stats.success_rate,
            duration_secs = stats.duration.as_secs_f64(),
            "Request session finished"
        );
    }
}

impl Drop for RequestSession {
    fn drop(&mut self) {
        if !self.finalized {
            let stats = self.session_stats();
            self.log_final(&stats);
        }
    }
}
