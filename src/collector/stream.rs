//! Deadline-bounded streaming collection

use async_stream::stream;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Span};

use crate::collector::config::CollectorConfig;
use crate::collector::dedup::Deduplicator;
use crate::collector::identity::IdentityRotator;
use crate::collector::pagination::{PaginationController, Termination};
use crate::collector::rate_limit::RateController;
use crate::collector::session::RequestSession;
use crate::metrics::CollectionMetrics;
use crate::query::Query;
use crate::random::RandomSource;
use crate::shutdown::{SharedShutdown, StopSignal};
use crate::source::ContentSource;
use crate::CollectedItem;

/// Lazy sequence of accepted items
pub type ItemStream = Pin<Box<dyn Stream<Item = CollectedItem> + Send>>;

/// Cycles queries in small batches until a deadline
///
/// Each cycle requests one batch per query and yields accepted items as soon
/// as the batch completes. A failed batch triggers a cool-down instead of
/// the regular pacing interval; the query is retried on the next cycle.
pub struct StreamWatcher {
    source: Arc<dyn ContentSource>,
    config: CollectorConfig,
    shutdown: Option<SharedShutdown>,
    span: Span,
}

impl StreamWatcher {
    /// Create a watcher
    pub fn new(source: Arc<dyn ContentSource>, config: CollectorConfig) -> Self {
        Self {
            source,
            config,
            shutdown: None,
            span: Span::none(),
        }
    }

    /// End the stream when shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Parent span for stream events
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Consume the watcher into a stream that ends `duration` from now
    ///
    /// Dropping the stream stops collection at its next suspension point.
    /// An invalid configuration is logged and yields an empty stream.
    pub fn watch(self, queries: Vec<Query>, duration: Duration) -> ItemStream {
        if let Err(reason) = self.config.validate() {
            error!(parent: &self.span, reason = %reason, "Invalid stream configuration");
            return Box::pin(futures::stream::empty());
        }
        if queries.is_empty() {
            warn!(parent: &self.span, "No queries to watch");
            return Box::pin(futures::stream::empty());
        }

        Box::pin(stream! {
            let deadline = Instant::now() + duration;
            let stop = StopSignal::new()
                .with_deadline(deadline)
                .with_optional_shutdown(self.shutdown.clone());
            let span = info_span!(
                parent: &self.span,
                "watch",
                source = self.source.name(),
                queries = queries.len(),
                duration_secs = duration.as_secs()
            );
            let metrics = CollectionMetrics::start("stream");

            let mut rng = RandomSource::new(self.config.seed);
            let rate = RateController::new(self.config.rate.clone(), rng.fork())
                .with_span(span.clone());
            let identities = IdentityRotator::new(&self.config.identity, rng.fork())
                .with_span(span.clone());
            let mut session = RequestSession::new(rate, identities)
                .with_stop(stop.clone())
                .with_span(span.clone());
            let mut dedup = Deduplicator::new();
            let mut cycle = 0u64;
            let mut yielded = 0usize;

            info!(parent: &span, "Starting stream");

            'watch: while !stop.is_triggered() {
                cycle += 1;
                debug!(parent: &span, cycle, "Starting cycle");

                for query in &queries {
                    if stop.is_triggered() {
                        break 'watch;
                    }

                    let result = PaginationController::new(
                        self.source.as_ref(),
                        &mut session,
                        &mut dedup,
                        &mut rng,
                    )
                    .with_config(&self.config.collection)
                    .with_limits(
                        self.config.stream.batch_size,
                        self.config.collection.max_iterations_per_query,
                    )
                    .with_span(span.clone())
                    .run(query)
                    .await;

                    let failed = matches!(result.termination, Termination::FetchFailed(_));
                    for item in result.items {
                        yielded += 1;
                        yield item;
                    }

                    let pause = if failed {
                        warn!(
                            parent: &span,
                            query = %query,
                            cool_down_secs = self.config.stream.cool_down.as_secs_f64(),
                            "Batch failed, cooling down"
                        );
                        self.config.stream.cool_down
                    } else {
                        self.config.stream.pacing.sample(&mut rng)
                    };
                    if !stop.pause(pause).await {
                        break 'watch;
                    }
                }
            }

            let stats = session.finish();
            metrics.record_success(yielded);
            info!(
                parent: &span,
                cycles = cycle,
                items = yielded,
                requests = stats.total_requests,
                "Stream finished"
            );
        })
    }
}
