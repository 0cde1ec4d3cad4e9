//! Post extraction from JSON search pages
//!
//! Expected page shape:
//!
//! ```json
//! {
//!   "posts": [
//!     { "id": "1", "author": "@trader", "content": "#nifty50 up", "posted_at": "2024-01-01T10:00:00Z",
//!       "likes": "1.2K", "reposts": 3, "replies": 0, "language": "en" }
//!   ],
//!   "next_cursor": "abc"
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use crate::source::{ItemExtractor, RawPage};
use crate::{CandidateItem, Fingerprint, Post};

/// Parses the JSON page format shared by the HTTP and mock sources
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPostExtractor;

impl JsonPostExtractor {
    /// Create an extractor
    pub fn new() -> Self {
        Self
    }

    /// Parse one post fragment; `None` when required fields are missing or invalid
    pub fn parse_post(&self, value: &Value) -> Option<CandidateItem> {
        let content = value.get("content")?.as_str()?.trim();
        if content.is_empty() {
            return None;
        }
        let posted_at = parse_timestamp(value.get("posted_at")?)?;
        let fingerprint = Fingerprint::from_content(content);

        let post_id = match value.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => fingerprint.as_str().chars().take(16).collect(),
        };
        let author = value
            .get("author")
            .and_then(Value::as_str)
            .map(|a| a.trim().trim_start_matches('@').to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let language = value
            .get("language")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .unwrap_or("en")
            .to_string();

        let is_repost = value
            .get("is_repost")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| content.starts_with("RT @"));
        let is_reply = value
            .get("is_reply")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| content.starts_with('@'));

        let post = Post {
            post_id,
            author,
            content: content.to_string(),
            posted_at,
            likes: count_field(value, "likes"),
            reposts: count_field(value, "reposts"),
            replies: count_field(value, "replies"),
            hashtags: extract_hashtags(content),
            mentions: extract_mentions(content),
            urls: extract_urls(content),
            is_repost,
            is_reply,
            language,
        };

        Some(CandidateItem::with_fingerprint(post, fingerprint))
    }
}

impl ItemExtractor for JsonPostExtractor {
    fn extract(&self, page: &RawPage) -> Vec<Option<CandidateItem>> {
        let parsed: Value = match serde_json::from_str(&page.body) {
            Ok(value) => value,
            Err(e) => {
                debug!(query = %page.query, error = %e, "Page body is not valid JSON");
                return Vec::new();
            }
        };

        match parsed.get("posts").and_then(Value::as_array) {
            Some(posts) => posts.iter().map(|p| self.parse_post(p)).collect(),
            None => Vec::new(),
        }
    }

    fn next_cursor(&self, page: &RawPage) -> Option<String> {
        let parsed: Value = serde_json::from_str(&page.body).ok()?;
        match parsed.get("next_cursor")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        _ => None,
    }
}

fn count_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => parse_compact_count(s).unwrap_or(0),
        _ => 0,
    }
}

/// Parse engagement counts like `"1,234"`, `"1.2K"` or `"3M"`
pub fn parse_compact_count(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let (number, scale) = match cleaned.chars().last()?.to_ascii_uppercase() {
        'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * scale).round() as u64)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn extract_prefixed(text: &str, prefix: char) -> Vec<String> {
    let mut found = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let at_boundary = prev.map(|p| !is_word_char(p)).unwrap_or(true);
        if c == prefix && at_boundary {
            let mut end = start + c.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !is_word_char(next) {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            if end > start + c.len_utf8() {
                found.push(text[start..end].to_string());
            }
            prev = text[..end].chars().last();
            continue;
        }
        prev = Some(c);
    }

    found
}

/// `#tags` in order of appearance
pub fn extract_hashtags(text: &str) -> Vec<String> {
    extract_prefixed(text, '#')
}

/// `@mentions` in order of appearance
pub fn extract_mentions(text: &str) -> Vec<String> {
    extract_prefixed(text, '@')
}

/// `http(s)://` links with trailing punctuation removed
pub fn extract_urls(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(|token| {
            token
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ')' | '!' | '?' | ';' | ':'))
                .to_string()
        })
        .collect()
}
