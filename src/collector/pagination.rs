//! Per-query pagination loop
//!
//! [`PaginationController`] walks one query's result pages as an explicit
//! state machine:
//!
//! ```text
//! Init -> Fetching -> Extracting -> Filtering -> Paginating -> Done
//!            ^                                      |
//!            +--------------------------------------+
//! ```
//!
//! It stops at the item target or the iteration ceiling, whichever comes
//! first. A fetch failure ends the loop with the items collected so far; it
//! is never propagated to the caller.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Span};

use crate::collector::config::{
    CollectionConfig, DelayRange, DEFAULT_MAX_ITEMS_PER_QUERY, DEFAULT_MAX_ITERATIONS_PER_QUERY,
    DEFAULT_TIME_WINDOW_HOURS,
};
use crate::collector::dedup::Deduplicator;
use crate::collector::session::{RequestSession, SessionError};
use crate::query::Query;
use crate::random::RandomSource;
use crate::shutdown::StopSignal;
use crate::source::{ContentSource, PageCursor, RawPage};
use crate::{CandidateItem, CollectedItem};

/// Posts dated this far in the future are still accepted (clock skew).
const FUTURE_TOLERANCE_HOURS: i64 = 1;

/// Acceptance window for post timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    lookback: ChronoDuration,
    future_tolerance: ChronoDuration,
}

impl TimeWindow {
    /// Accept posts from the last `hours` hours
    pub fn hours(hours: u32) -> Self {
        Self {
            lookback: ChronoDuration::hours(i64::from(hours)),
            future_tolerance: ChronoDuration::hours(FUTURE_TOLERANCE_HOURS),
        }
    }

    /// Whether `timestamp` falls inside the window ending at `now`
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let after_start = now
            .checked_sub_signed(self.lookback)
            .map_or(true, |start| timestamp >= start);
        let before_end = now
            .checked_add_signed(self.future_tolerance)
            .map_or(true, |end| timestamp <= end);
        after_start && before_end
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::hours(DEFAULT_TIME_WINDOW_HOURS)
    }
}

/// Why a query loop ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Item target reached
    TargetReached,
    /// Iteration ceiling reached
    IterationCeiling,
    /// A page fetch failed
    FetchFailed(String),
    /// Deadline or shutdown fired
    Interrupted,
}

impl Termination {
    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Termination::TargetReached => "target_reached",
            Termination::IterationCeiling => "iteration_ceiling",
            Termination::FetchFailed(_) => "fetch_failed",
            Termination::Interrupted => "interrupted",
        }
    }
}

/// Candidates filtered out of a query, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    /// Fragments the extractor could not turn into a post
    pub malformed: usize,
    /// Posts outside the time window
    pub out_of_window: usize,
    /// Posts already collected in this run
    pub duplicates: usize,
}

/// Outcome of one query loop
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The query
    pub query: Query,
    /// Accepted items, in acceptance order
    pub items: Vec<CollectedItem>,
    /// Pages successfully fetched
    pub pages_fetched: usize,
    /// Why the loop ended
    pub termination: Termination,
    /// Rejected candidates
    pub rejected: RejectionCounts,
}

enum PageState {
    Init,
    Fetching,
    Extracting(RawPage),
    Filtering(Vec<CandidateItem>),
    Paginating,
    Done(Termination),
}

/// Drives one query through fetch, extract, filter and paginate
pub struct PaginationController<'a> {
    source: &'a dyn ContentSource,
    session: &'a mut RequestSession,
    dedup: &'a mut Deduplicator,
    rng: &'a mut RandomSource,
    max_items: usize,
    max_iterations: usize,
    window: TimeWindow,
    think_time: DelayRange,
    stop: StopSignal,
    span: Span,
}

impl<'a> PaginationController<'a> {
    /// Create a controller borrowing the run's session, deduplicator and randomness
    pub fn new(
        source: &'a dyn ContentSource,
        session: &'a mut RequestSession,
        dedup: &'a mut Deduplicator,
        rng: &'a mut RandomSource,
    ) -> Self {
        let stop = session.stop().clone();
        let defaults = CollectionConfig::default();
        Self {
            source,
            session,
            dedup,
            rng,
            max_items: DEFAULT_MAX_ITEMS_PER_QUERY,
            max_iterations: DEFAULT_MAX_ITERATIONS_PER_QUERY,
            window: TimeWindow::default(),
            think_time: defaults.think_time,
            stop,
            span: Span::none(),
        }
    }

    /// Apply limits, window and think-time from `config`
    pub fn with_config(self, config: &CollectionConfig) -> Self {
        self.with_limits(config.max_items_per_query, config.max_iterations_per_query)
            .with_time_window(TimeWindow::hours(config.time_window_hours))
            .with_think_time(config.think_time)
    }

    /// Item target and iteration ceiling
    pub fn with_limits(mut self, max_items: usize, max_iterations: usize) -> Self {
        self.max_items = max_items;
        self.max_iterations = max_iterations;
        self
    }

    /// Timestamp acceptance window
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Pause range between pages
    pub fn with_think_time(mut self, think_time: DelayRange) -> Self {
        self.think_time = think_time;
        self
    }

    /// Stop signal ending the loop early
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Parent span for this query's events
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run the loop for `query`
    pub async fn run(self, query: &Query) -> QueryResult {
        let span = info_span!(parent: &self.span, "query", query = %query);
        let source = self.source;

        let mut items: Vec<CollectedItem> = Vec::new();
        let mut rejected = RejectionCounts::default();
        let mut cursor = PageCursor::start();
        let mut next_token: Option<String> = None;
        let mut pages_fetched = 0usize;
        let mut iterations = 0usize;
        let mut state = PageState::Init;

        let termination = loop {
            state = match state {
                PageState::Init => {
                    debug!(
                        parent: &span,
                        max_items = self.max_items,
                        max_iterations = self.max_iterations,
                        "Starting query"
                    );
                    PageState::Fetching
                }

                PageState::Fetching => {
                    if self.stop.is_triggered() {
                        PageState::Done(Termination::Interrupted)
                    } else {
                        let page_cursor = &cursor;
                        let fetched = self
                            .session
                            .execute(|identity| async move {
                                source.fetch(query, page_cursor, &identity).await
                            })
                            .await;

                        match fetched {
                            Ok(page) => {
                                pages_fetched += 1;
                                PageState::Extracting(page)
                            }
                            Err(SessionError::Interrupted) => {
                                PageState::Done(Termination::Interrupted)
                            }
                            Err(SessionError::Fetch(e)) => {
                                warn!(
                                    parent: &span,
                                    page = cursor.page,
                                    error = %e,
                                    collected = items.len(),
                                    "Fetch failed, ending query with partial results"
                                );
                                PageState::Done(Termination::FetchFailed(e.to_string()))
                            }
                        }
                    }
                }

                PageState::Extracting(page) => {
                    if pages_fetched == 1 {
                        match source.probe_interstitial(&page) {
                            Some(interstitial) => warn!(
                                parent: &span,
                                source = source.name(),
                                %interstitial,
                                "Interstitial detected on first page"
                            ),
                            None => debug!(parent: &span, "No interstitial on first page"),
                        }
                    }

                    next_token = source.next_cursor(&page);
                    let mut candidates = Vec::new();
                    for fragment in source.extract(&page) {
                        match fragment {
                            Some(candidate) => candidates.push(candidate),
                            None => {
                                rejected.malformed += 1;
                                crate::metrics::record_item("malformed");
                            }
                        }
                    }
                    PageState::Filtering(candidates)
                }

                PageState::Filtering(candidates) => {
                    let now = Utc::now();
                    let before = items.len();
                    for candidate in candidates {
                        if items.len() >= self.max_items {
                            break;
                        }
                        if !self.window.contains(candidate.post.posted_at, now) {
                            rejected.out_of_window += 1;
                            crate::metrics::record_item("out_of_window");
                            continue;
                        }
                        if !self.dedup.check_and_add(&candidate.fingerprint) {
                            rejected.duplicates += 1;
                            crate::metrics::record_item("duplicate");
                            continue;
                        }
                        crate::metrics::record_item("accepted");
                        items.push(CollectedItem::accept(query, candidate));
                    }
                    debug!(
                        parent: &span,
                        page = cursor.page,
                        accepted = items.len() - before,
                        total = items.len(),
                        "Filtered page"
                    );
                    PageState::Paginating
                }

                PageState::Paginating => {
                    iterations += 1;
                    if items.len() >= self.max_items {
                        PageState::Done(Termination::TargetReached)
                    } else if iterations >= self.max_iterations {
                        PageState::Done(Termination::IterationCeiling)
                    } else {
                        cursor = cursor.advance(next_token.take());
                        let pause = self.think_time.sample(self.rng);
                        debug!(
                            parent: &span,
                            iteration = iterations,
                            think_ms = pause.as_millis() as u64,
                            "Advancing to next page"
                        );
                        if self.stop.pause(pause).await {
                            PageState::Fetching
                        } else {
                            PageState::Done(Termination::Interrupted)
                        }
                    }
                }

                PageState::Done(termination) => break termination,
            };
        };

        crate::metrics::record_query(termination.label());
        info!(
            parent: &span,
            items = items.len(),
            pages = pages_fetched,
            termination = termination.label(),
            malformed = rejected.malformed,
            out_of_window = rejected.out_of_window,
            duplicates = rejected.duplicates,
            "Query finished"
        );

        QueryResult {
            query: query.clone(),
            items,
            pages_fetched,
            termination,
            rejected,
        }
    }
}
