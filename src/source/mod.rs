//! Content sources
//!
//! A content source combines a [`PageFetcher`] (how to obtain one raw page of
//! results for a query) with an [`ItemExtractor`] (how to turn that page into
//! candidate posts). The collection engine only ever sees the combined
//! [`ContentSource`] capability, selected at construction via [`create_source`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::collector::Identity;
use crate::query::Query;
use crate::CandidateItem;

pub mod extract;
pub mod http;
pub mod mock;

pub use extract::JsonPostExtractor;
pub use http::HttpSource;
pub use mock::{MockSource, MockSourceConfig};

/// Page fetch errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status code
    #[error("unexpected status: {0}")]
    Status(u16),

    /// Remote signalled throttling
    #[error("rate limit exceeded")]
    RateLimited,

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Source could not be constructed
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Failure injected by a synthetic source
    #[error("injected failure: {0}")]
    Injected(String),
}

impl FetchError {
    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            FetchError::Http(_) => "http",
            FetchError::Status(_) => "status",
            FetchError::RateLimited => "rate_limited",
            FetchError::Timeout => "timeout",
            FetchError::Network(_) => "network",
            FetchError::InvalidResponse(_) => "invalid_response",
            FetchError::InvalidSource(_) => "invalid_source",
            FetchError::Injected(_) => "injected",
        }
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Position within a query's result pages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageCursor {
    /// Zero-based page index
    pub page: usize,
    /// Opaque continuation token from the previous page
    pub token: Option<String>,
}

impl PageCursor {
    /// Cursor for the first page
    pub fn start() -> Self {
        Self::default()
    }

    /// Cursor for the following page
    pub fn advance(&self, token: Option<String>) -> Self {
        Self {
            page: self.page + 1,
            token,
        }
    }
}

/// One fetched page of results
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// Query the page was fetched for
    pub query: Query,
    /// Cursor the page was fetched at
    pub cursor: PageCursor,
    /// Raw response body
    pub body: String,
    /// Fetch completion time
    pub fetched_at: DateTime<Utc>,
}

impl RawPage {
    /// Page fetched now
    pub fn new(query: Query, cursor: PageCursor, body: impl Into<String>) -> Self {
        Self {
            query,
            cursor,
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Blocking overlay detected on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interstitial {
    /// Login prompt covering the results
    LoginWall,
    /// Challenge page
    Captcha,
}

impl fmt::Display for Interstitial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interstitial::LoginWall => f.write_str("login wall"),
            Interstitial::Captcha => f.write_str("captcha"),
        }
    }
}

/// Obtains raw result pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of results for `query` at `cursor`, presenting `identity`
    async fn fetch(
        &self,
        query: &Query,
        cursor: &PageCursor,
        identity: &Identity,
    ) -> FetchResult<RawPage>;

    /// Detect a blocking overlay on a freshly fetched page
    fn probe_interstitial(&self, _page: &RawPage) -> Option<Interstitial> {
        None
    }

    /// Source name for logs
    fn name(&self) -> &str;
}

/// Converts a raw page into candidate posts
pub trait ItemExtractor: Send + Sync {
    /// One entry per fragment on the page; `None` for a malformed fragment
    fn extract(&self, page: &RawPage) -> Vec<Option<CandidateItem>>;

    /// Continuation token for the next page, if the page carries one
    fn next_cursor(&self, _page: &RawPage) -> Option<String> {
        None
    }
}

/// Combined fetch + extract capability
pub trait ContentSource: PageFetcher + ItemExtractor {}

impl<T: PageFetcher + ItemExtractor + ?Sized> ContentSource for T {}

/// Source selection
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Synthetic posts
    Mock(MockSourceConfig),
    /// JSON-over-HTTP search endpoint
    Http {
        /// Search endpoint URL
        base_url: String,
    },
}

impl SourceKind {
    /// Mock source with default settings
    pub fn mock() -> Self {
        SourceKind::Mock(MockSourceConfig::default())
    }

    /// HTTP source for `base_url`
    pub fn http(base_url: impl Into<String>) -> Self {
        SourceKind::Http {
            base_url: base_url.into(),
        }
    }
}

/// Create a content source
///
/// # Errors
/// Returns error if the HTTP endpoint URL is invalid or the client cannot be built
pub fn create_source(kind: &SourceKind) -> FetchResult<Box<dyn ContentSource>> {
    match kind {
        SourceKind::Mock(config) => Ok(Box::new(MockSource::new(config.clone()))),
        SourceKind::Http { base_url } => Ok(Box::new(HttpSource::new(base_url)?)),
    }
}
