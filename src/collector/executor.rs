//! Batch collection driver

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Span};

use crate::collector::config::CollectorConfig;
use crate::collector::dedup::Deduplicator;
use crate::collector::identity::IdentityRotator;
use crate::collector::pagination::{PaginationController, QueryResult, RejectionCounts, Termination};
use crate::collector::rate_limit::RateController;
use crate::collector::session::{RequestSession, SessionStats};
use crate::collector::CollectorError;
use crate::metrics::CollectionMetrics;
use crate::query::Query;
use crate::random::RandomSource;
use crate::shutdown::{SharedShutdown, StopSignal};
use crate::source::ContentSource;
use crate::CollectedItem;

/// Per-query outcome within a batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    /// Query text
    pub query: String,
    /// Items accepted for this query
    pub items: usize,
    /// Pages fetched
    pub pages_fetched: usize,
    /// Why the query loop ended
    pub termination: Termination,
    /// Rejected candidates
    pub rejected: RejectionCounts,
}

impl From<&QueryResult> for QuerySummary {
    fn from(result: &QueryResult) -> Self {
        Self {
            query: result.query.to_string(),
            items: result.items.len(),
            pages_fetched: result.pages_fetched,
            termination: result.termination.clone(),
            rejected: result.rejected,
        }
    }
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct CollectionReport {
    /// Deduplicated items, grouped by query in input order
    pub items: Vec<CollectedItem>,
    /// One summary per query that was started
    pub queries: Vec<QuerySummary>,
    /// Final request session statistics
    pub stats: SessionStats,
    /// Distinct fingerprints seen during the run
    pub unique_fingerprints: usize,
}

impl CollectionReport {
    /// Whether every query was started
    pub fn is_complete(&self, query_count: usize) -> bool {
        self.queries.len() == query_count
    }
}

/// Runs every query once, sharing one session and one deduplicator
///
/// # Examples
///
/// ```no_run
/// use social_collector::collector::{CollectionExecutor, CollectorConfig};
/// use social_collector::query::Query;
/// use social_collector::source::MockSource;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = CollectionExecutor::new(Arc::new(MockSource::default()), CollectorConfig::default());
/// let report = executor.collect(&[Query::parse("#sensex")?]).await?;
/// assert_eq!(report.queries.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct CollectionExecutor {
    source: Arc<dyn ContentSource>,
    config: CollectorConfig,
    shutdown: Option<SharedShutdown>,
    span: Span,
}

impl CollectionExecutor {
    /// Create an executor
    pub fn new(source: Arc<dyn ContentSource>, config: CollectorConfig) -> Self {
        Self {
            source,
            config,
            shutdown: None,
            span: Span::none(),
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Parent span for run events
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every query in order
    ///
    /// Per-query fetch failures end only that query. Shutdown skips the
    /// remaining queries; the report covers what was collected.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or `queries` is empty
    pub async fn collect(&self, queries: &[Query]) -> Result<CollectionReport, CollectorError> {
        let metrics = CollectionMetrics::start("batch");
        if let Err(e) = self.config.validate() {
            metrics.record_failure(&e);
            return Err(CollectorError::InvalidConfig(e));
        }
        if queries.is_empty() {
            metrics.record_failure("no queries");
            return Err(CollectorError::NoQueries);
        }

        let span = info_span!(
            parent: &self.span,
            "collect",
            source = self.source.name(),
            queries = queries.len()
        );

        let mut rng = RandomSource::new(self.config.seed);
        let stop = StopSignal::new().with_optional_shutdown(self.shutdown.clone());
        let rate = RateController::new(self.config.rate.clone(), rng.fork()).with_span(span.clone());
        let identities =
            IdentityRotator::new(&self.config.identity, rng.fork()).with_span(span.clone());
        let mut session = RequestSession::new(rate, identities)
            .with_stop(stop.clone())
            .with_span(span.clone());
        let mut dedup = Deduplicator::new();

        info!(parent: &span, "Starting batch collection");

        let mut items = Vec::new();
        let mut summaries = Vec::with_capacity(queries.len());

        for (idx, query) in queries.iter().enumerate() {
            if idx > 0 {
                let pause = self.config.collection.query_pause.sample(&mut rng);
                debug!(
                    parent: &span,
                    pause_ms = pause.as_millis() as u64,
                    next_query = %query,
                    "Pausing between queries"
                );
                stop.pause(pause).await;
            }
            if stop.is_triggered() {
                warn!(
                    parent: &span,
                    skipped = queries.len() - idx,
                    "Shutdown requested, skipping remaining queries"
                );
                break;
            }

            let result = PaginationController::new(
                self.source.as_ref(),
                &mut session,
                &mut dedup,
                &mut rng,
            )
            .with_config(&self.config.collection)
            .with_span(span.clone())
            .run(query)
            .await;

            summaries.push(QuerySummary::from(&result));
            items.extend(result.items);
        }

        let stats = session.finish();
        metrics.record_success(items.len());

        info!(
            parent: &span,
            items = items.len(),
            queries_run = summaries.len(),
            unique = dedup.len(),
            "Batch collection complete"
        );

        Ok(CollectionReport {
            items,
            queries: summaries,
            stats,
            unique_fingerprints: dedup.len(),
        })
    }
}
