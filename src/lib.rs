//! # Social Collector Library
//!
//! An adaptive collection engine for social-media posts. Given a set of topic
//! queries (hashtags or keywords), it pages through a rate-limited,
//! automation-sensitive source while pacing requests, rotating client
//! identities, and suppressing duplicates across the whole run.
//!
//! ## Features
//!
//! - **Adaptive pacing**: base delay, exponential backoff on consecutive
//!   failures, and jitter, bounded by a configured maximum delay
//! - **Identity rotation**: random or round-robin user-agent profiles with
//!   randomized optional headers
//! - **Bounded pagination**: every query loop stops at a target count or an
//!   iteration ceiling, whichever comes first
//! - **Run-scoped deduplication**: content fingerprints are shared across all
//!   queries in a run
//! - **Streaming mode**: a lazy, deadline-bounded stream of accepted posts
//!
//! ## Quick Start
//!
//! ```no_run
//! use social_collector::collector::{CollectionExecutor, CollectorConfig};
//! use social_collector::query::Query;
//! use social_collector::source::{create_source, SourceKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = create_source(&SourceKind::mock())?;
//! let executor = CollectionExecutor::new(source.into(), CollectorConfig::default());
//!
//! let queries = vec![Query::parse("#nifty50")?, Query::parse("sensex")?];
//! let report = executor.collect(&queries).await?;
//! println!("collected {} posts", report.items.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`collector`] - Rate controller, identity rotation, request session,
//!   pagination, deduplication, batch executor and stream watcher
//! - [`source`] - Page fetcher / item extractor capability and its mock and
//!   HTTP implementations
//! - [`query`] - Topic query parsing
//! - [`output`] - CSV / JSON writers and run summaries
//! - [`shutdown`] - Cooperative cancellation (Ctrl+C and deadlines)
//! - [`metrics`] - Prometheus metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Collection engine
pub mod collector;

/// Observability metrics
pub mod metrics;

/// Item writers and run summaries
pub mod output;

/// Topic query parsing
pub mod query;

/// Seedable randomness shared by pacing, jitter and identity selection
pub mod random;

/// Graceful shutdown and deadline coordination
pub mod shutdown;

/// Content sources (page fetching and item extraction)
pub mod source;

pub use query::Query;

/// Content-derived identifier used for deduplication
///
/// Two posts with the same normalized text share a fingerprint, so reposted
/// or copy-pasted content collapses to a single collected item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an externally computed fingerprint
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// SHA-256 over the lower-cased, whitespace-collapsed content
    pub fn from_content(content: &str) -> Self {
        let normalized = content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Borrow the fingerprint text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A social-media post as produced by an item extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Source-assigned post ID
    pub post_id: String,
    /// Author handle without the leading `@`
    pub author: String,
    /// Post text
    pub content: String,
    /// Publication time
    pub posted_at: DateTime<Utc>,
    /// Like count
    pub likes: u64,
    /// Repost count
    pub reposts: u64,
    /// Reply count
    pub replies: u64,
    /// Hashtags found in the content (with `#`)
    pub hashtags: Vec<String>,
    /// Mentions found in the content (with `@`)
    pub mentions: Vec<String>,
    /// URLs found in the content
    pub urls: Vec<String>,
    /// Whether the post is a repost
    pub is_repost: bool,
    /// Whether the post is a reply
    pub is_reply: bool,
    /// Language code (e.g. "en")
    pub language: String,
}

/// A post extracted from a page, not yet accepted or rejected
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    /// Extracted post
    pub post: Post,
    /// Deduplication fingerprint
    pub fingerprint: Fingerprint,
}

impl CandidateItem {
    /// Build a candidate, fingerprinting the post content
    pub fn new(post: Post) -> Self {
        let fingerprint = Fingerprint::from_content(&post.content);
        Self { post, fingerprint }
    }

    /// Build a candidate with an externally supplied fingerprint
    pub fn with_fingerprint(post: Post, fingerprint: Fingerprint) -> Self {
        Self { post, fingerprint }
    }
}

/// A post accepted into a collection run
///
/// Never mutated after acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedItem {
    /// Query that produced this post
    pub query: String,
    /// The post itself
    #[serde(flatten)]
    pub post: Post,
    /// Deduplication fingerprint
    pub fingerprint: Fingerprint,
    /// When the collector accepted the post
    pub accepted_at: DateTime<Utc>,
}

impl CollectedItem {
    /// Accept a candidate for the given query at the current time
    pub fn accept(query: &Query, candidate: CandidateItem) -> Self {
        Self {
            query: query.to_string(),
            post: candidate.post,
            fingerprint: candidate.fingerprint,
            accepted_at: Utc::now(),
        }
    }
}
