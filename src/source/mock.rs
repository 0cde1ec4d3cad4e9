//! Synthetic content source
//!
//! Generates deterministic pages of posts in the JSON page format, with
//! knobs for repeated content, malformed fragments, injected failures and
//! simulated latency. Drives the `--mock` CLI mode and the test suite.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::collector::Identity;
use crate::query::Query;
use crate::random::RandomSource;
use crate::source::extract::JsonPostExtractor;
use crate::source::{
    FetchError, FetchResult, ItemExtractor, PageCursor, PageFetcher, RawPage,
};
use crate::CandidateItem;

const PHRASES: [&str; 8] = [
    "breaks out above resistance",
    "looks weak into the close",
    "volumes picking up today",
    "gap up opening expected",
    "support holding for now",
    "profit booking at higher levels",
    "options data turning bullish",
    "consolidating in a tight range",
];

/// Mock source settings
#[derive(Debug, Clone, PartialEq)]
pub struct MockSourceConfig {
    /// Posts per page
    pub page_size: usize,
    /// Pages with fresh content; later pages repeat the last unique page
    pub unique_pages: usize,
    /// Fail every Nth fetch (0 = never)
    pub fail_every: usize,
    /// Make every Nth post malformed (0 = never)
    pub malformed_every: usize,
    /// Seed for engagement counts and phrasing
    pub seed: u64,
    /// Simulated fetch latency
    pub latency: Duration,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            unique_pages: 5,
            fail_every: 0,
            malformed_every: 0,
            seed: 42,
            latency: Duration::ZERO,
        }
    }
}

/// Deterministic synthetic source
#[derive(Debug)]
pub struct MockSource {
    config: MockSourceConfig,
    extractor: JsonPostExtractor,
    calls: AtomicUsize,
    seen_user_agents: Mutex<Vec<String>>,
}

impl MockSource {
    /// Create a mock source
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            extractor: JsonPostExtractor::new(),
            calls: AtomicUsize::new(0),
            seen_user_agents: Mutex::new(Vec::new()),
        }
    }

    /// Number of fetches attempted so far
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User agents presented so far, in request order
    pub fn seen_user_agents(&self) -> Vec<String> {
        self.seen_user_agents
            .lock()
            .map(|agents| agents.clone())
            .unwrap_or_default()
    }

    /// Render the body for `query` at page `page`
    pub fn render_page(&self, query: &Query, page: usize) -> String {
        let effective_page = page.min(self.config.unique_pages.saturating_sub(1));
        let query_hash = {
            let mut hasher = DefaultHasher::new();
            query.hash(&mut hasher);
            hasher.finish()
        };
        let now = Utc::now();

        let posts: Vec<Value> = (0..self.config.page_size)
            .map(|i| {
                let k = effective_page * self.config.page_size + i;
                if self.config.malformed_every > 0 && (k + 1) % self.config.malformed_every == 0 {
                    return json!({ "id": format!("bad-{k}"), "content": Value::Null });
                }

                let mut rng = RandomSource::from_seed(self.config.seed ^ query_hash ^ k as u64);
                let phrase = PHRASES[rng.index(PHRASES.len())];
                let age_minutes = ((k * 7) % (23 * 60)) as i64;
                json!({
                    "id": format!("{}-{k}", query.slug()),
                    "author": format!("@trader{}", rng.index(500)),
                    "content": format!("{query} update {k}: {phrase} #markets"),
                    "posted_at": (now - ChronoDuration::minutes(age_minutes)).to_rfc3339(),
                    "likes": rng.index(5_000),
                    "reposts": rng.index(500),
                    "replies": rng.index(100),
                    "language": "en",
                })
            })
            .collect();

        json!({
            "posts": posts,
            "next_cursor": format!("page-{}", page + 1),
        })
        .to_string()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(MockSourceConfig::default())
    }
}

#[async_trait]
impl PageFetcher for MockSource {
    async fn fetch(
        &self,
        query: &Query,
        cursor: &PageCursor,
        identity: &Identity,
    ) -> FetchResult<RawPage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut agents) = self.seen_user_agents.lock() {
            agents.push(identity.user_agent.clone());
        }

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if self.config.fail_every > 0 && call % self.config.fail_every == 0 {
            return Err(FetchError::Injected(format!("fetch #{call} for {query}")));
        }

        Ok(RawPage::new(
            query.clone(),
            cursor.clone(),
            self.render_page(query, cursor.page),
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl ItemExtractor for MockSource {
    fn extract(&self, page: &RawPage) -> Vec<Option<CandidateItem>> {
        self.extractor.extract(page)
    }

    fn next_cursor(&self, page: &RawPage) -> Option<String> {
        self.extractor.next_cursor(page)
    }
}
