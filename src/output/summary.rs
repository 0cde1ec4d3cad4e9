//! Run summary statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::{OutputError, OutputResult};
use crate::CollectedItem;

/// Number of hashtags listed in [`RunSummary::top_hashtags`]
const TOP_HASHTAGS: usize = 10;

/// Aggregate statistics over a set of collected items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items in the run
    pub total_items: usize,
    /// Distinct authors
    pub unique_authors: usize,
    /// Distinct hashtags (case-insensitive)
    pub distinct_hashtags: usize,
    /// Most frequent hashtags with their counts
    pub top_hashtags: Vec<(String, usize)>,
    /// Items per language code
    pub languages: BTreeMap<String, usize>,
    /// Items per query
    pub per_query: BTreeMap<String, usize>,
    /// Earliest post time
    pub earliest_post: Option<DateTime<Utc>>,
    /// Latest post time
    pub latest_post: Option<DateTime<Utc>>,
    /// Mean likes per item
    pub avg_likes: f64,
    /// Share of reposts
    pub repost_ratio: f64,
    /// Summary creation time
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    /// Summarize `items`
    pub fn from_items(items: &[CollectedItem]) -> Self {
        let mut authors = HashSet::new();
        let mut hashtags: BTreeMap<String, usize> = BTreeMap::new();
        let mut languages = BTreeMap::new();
        let mut per_query = BTreeMap::new();
        let mut likes = 0u64;
        let mut reposts = 0usize;

        for item in items {
            authors.insert(item.post.author.as_str());
            for tag in &item.post.hashtags {
                *hashtags.entry(tag.to_lowercase()).or_default() += 1;
            }
            *languages.entry(item.post.language.clone()).or_default() += 1;
            *per_query.entry(item.query.clone()).or_default() += 1;
            likes = likes.saturating_add(item.post.likes);
            if item.post.is_repost {
                reposts += 1;
            }
        }

        let mut top_hashtags: Vec<(String, usize)> = hashtags
            .iter()
            .map(|(tag, count)| (tag.clone(), *count))
            .collect();
        top_hashtags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_hashtags.truncate(TOP_HASHTAGS);

        let total = items.len();
        let ratio = |n: f64| if total == 0 { 0.0 } else { n / total as f64 };

        Self {
            total_items: total,
            unique_authors: authors.len(),
            distinct_hashtags: hashtags.len(),
            top_hashtags,
            languages,
            per_query,
            earliest_post: items.iter().map(|i| i.post.posted_at).min(),
            latest_post: items.iter().map(|i| i.post.posted_at).max(),
            avg_likes: ratio(likes as f64),
            repost_ratio: ratio(reposts as f64),
            generated_at: Utc::now(),
        }
    }

    /// Write the summary as pretty JSON, creating parent directories
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> OutputResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| OutputError::IoError(format!("Failed to write summary: {}", e)))
    }
}
