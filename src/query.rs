//! Topic query parsing and validation
//!
//! A query is either a hashtag (`#nifty50`) or a free-text keyword
//! (`stock market`). Hashtags are normalized to lowercase; keywords keep
//! their case but have their whitespace collapsed.

use std::fmt;

/// Kind of topic query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// `#tag` search
    Hashtag,
    /// Free-text search
    Keyword,
}

/// A topic query driving one pagination loop
///
/// # Examples
///
/// ```
/// use social_collector::query::{Query, QueryKind};
///
/// let q = Query::parse("#Nifty50").unwrap();
/// assert_eq!(q.kind(), QueryKind::Hashtag);
/// assert_eq!(q.to_string(), "#nifty50");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    kind: QueryKind,
    term: String,
}

impl Query {
    /// Parse a query string
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty, is a bare `#`, or a hashtag
    /// contains whitespace.
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }

        if let Some(tag) = trimmed.strip_prefix('#') {
            if tag.is_empty() {
                return Err(QueryError::InvalidHashtag(trimmed.to_string()));
            }
            if tag.chars().any(|c| c.is_whitespace() || c == '#') {
                return Err(QueryError::InvalidHashtag(trimmed.to_string()));
            }
            return Ok(Self {
                kind: QueryKind::Hashtag,
                term: tag.to_lowercase(),
            });
        }

        let term = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(Self {
            kind: QueryKind::Keyword,
            term,
        })
    }

    /// Parse a list of query strings, failing on the first invalid one
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Self>, QueryError> {
        inputs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    /// Query kind
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Term without the `#` prefix
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Text to send to the remote search endpoint
    pub fn search_term(&self) -> String {
        self.to_string()
    }

    /// Lowercase, filesystem-safe form (e.g. for output file names)
    ///
    /// ```
    /// use social_collector::query::Query;
    ///
    /// let q = Query::parse("Stock Market").unwrap();
    /// assert_eq!(q.slug(), "stock_market");
    /// ```
    pub fn slug(&self) -> String {
        self.term
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            QueryKind::Hashtag => write!(f, "#{}", self.term),
            QueryKind::Keyword => f.write_str(&self.term),
        }
    }
}

/// Errors that can occur during query parsing
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Empty or whitespace-only query
    #[error("query cannot be empty")]
    Empty,

    /// Malformed hashtag
    #[error("invalid hashtag: {0}")]
    InvalidHashtag(String),
}
