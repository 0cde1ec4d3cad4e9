//! Adaptive collection engine
//!
//! This module paces, identifies, paginates and deduplicates requests against
//! a [`ContentSource`](crate::source::ContentSource).
//!
//! # Overview
//!
//! Components, leaves first:
//!
//! 1. **Pacing**: [`rate_limit::RateController`] computes the delay before each
//!    request (base delay, backoff on consecutive failures, jitter)
//! 2. **Identity**: [`identity::IdentityRotator`] picks a browser profile per
//!    request
//! 3. **Session**: [`session::RequestSession`] wraps one fetch with both and
//!    records the outcome
//! 4. **Deduplication**: [`dedup::Deduplicator`] tracks fingerprints for the
//!    whole run
//! 5. **Pagination**: [`pagination::PaginationController`] runs one query to
//!    its item target or iteration ceiling
//! 6. **Drivers**: [`executor::CollectionExecutor`] runs queries once (batch);
//!    [`stream::StreamWatcher`] cycles them until a deadline (streaming)
//!
//! # Error Handling
//!
//! Fetch failures never abort a run: they end the affected query's loop with
//! partial results. Only invalid configuration or an empty query list make
//! [`CollectionExecutor::collect`] fail.
//!
//! # Related Modules
//!
//! - [`crate::source`] - Page fetching and item extraction
//! - [`crate::shutdown`] - Deadlines and Ctrl+C handling
//! - [`crate::output`] - Writing collected items

pub mod config;
pub mod dedup;
pub mod executor;
pub mod identity;
pub mod pagination;
pub mod rate_limit;
pub mod session;
pub mod stream;

pub use config::{
    BackoffCurve, CollectionConfig, CollectorConfig, DelayRange, IdentityConfig,
    IdentityStrategy, RateLimitConfig, StreamConfig,
};
pub use dedup::Deduplicator;
pub use executor::{CollectionExecutor, CollectionReport, QuerySummary};
pub use identity::{Identity, IdentityRotator};
pub use pagination::{PaginationController, QueryResult, RejectionCounts, Termination, TimeWindow};
pub use rate_limit::{BackoffState, Outcome, RateController, RateStats, RollingHistory};
pub use session::{RequestSession, SessionError, SessionStats};
pub use stream::{ItemStream, StreamWatcher};

/// Collection errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Nothing to collect
    #[error("no queries given")]
    NoQueries,
}
