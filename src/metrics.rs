//! Collection metrics
//!
//! Records request outcomes, pacing waits, backoff pressure, item
//! dispositions and query terminations through the `metrics` facade. Without
//! an installed recorder every call is a no-op; [`init_metrics`] installs a
//! Prometheus exporter serving a scrape endpoint.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "collector_requests_total",
        Unit::Count,
        "Page requests issued, by outcome"
    );

    describe_histogram!(
        "collector_request_duration_seconds",
        Unit::Seconds,
        "Page request latency in seconds"
    );

    describe_histogram!(
        "collector_rate_wait_seconds",
        Unit::Seconds,
        "Time spent waiting before a request"
    );

    describe_gauge!(
        "collector_backoff_multiplier",
        Unit::Count,
        "Current adaptive backoff multiplier"
    );

    describe_counter!(
        "collector_items_total",
        Unit::Count,
        "Extracted candidates, by disposition"
    );

    describe_counter!(
        "collector_queries_total",
        Unit::Count,
        "Finished query loops, by termination reason"
    );

    describe_counter!(
        "collector_runs_completed_total",
        Unit::Count,
        "Completed collection runs"
    );

    describe_counter!(
        "collector_runs_failed_total",
        Unit::Count,
        "Collection runs that ended in an error"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record a completed page request
pub fn record_request(outcome: &'static str, latency: Duration) {
    counter!("collector_requests_total", "outcome" => outcome).increment(1);
    histogram!("collector_request_duration_seconds", "outcome" => outcome)
        .record(latency.as_secs_f64());
}

/// Record a pacing wait
pub fn record_rate_wait(delay: Duration) {
    histogram!("collector_rate_wait_seconds").record(delay.as_secs_f64());
}

/// Record the current backoff multiplier
pub fn record_backoff(multiplier: f64) {
    gauge!("collector_backoff_multiplier").set(multiplier);
}

/// Record a candidate disposition (`accepted`, `duplicate`, `out_of_window`, `malformed`)
pub fn record_item(disposition: &'static str) {
    counter!("collector_items_total", "disposition" => disposition).increment(1);
}

/// Record a finished query loop
pub fn record_query(termination: &'static str) {
    counter!("collector_queries_total", "termination" => termination).increment(1);
}

/// Collection run metrics
pub struct CollectionMetrics {
    mode: String,
    start_time: Instant,
}

impl CollectionMetrics {
    /// Start tracking a run in `mode` (`batch` or `stream`)
    pub fn start(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        debug!(mode = %mode, "Collection run started");
        Self {
            mode,
            start_time: Instant::now(),
        }
    }

    /// Record successful completion
    pub fn record_success(&self, items_count: usize) {
        let duration = self.start_time.elapsed();

        counter!("collector_runs_completed_total", "mode" => self.mode.clone()).increment(1);

        info!(
            mode = %self.mode,
            items_count = items_count,
            duration_secs = duration.as_secs(),
            "Collection run completed"
        );
    }

    /// Record a failed run
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "collector_runs_failed_total",
            "mode" => self.mode.clone(),
        )
        .increment(1);

        error!(
            mode = %self.mode,
            error = %error,
            duration_secs = duration.as_secs(),
            "Collection run failed"
        );
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
