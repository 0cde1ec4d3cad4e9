//! Client identity rotation
//!
//! Each request presents a browser-like identity: a user agent plus a header
//! set in which some optional headers are included at random.

use tracing::{debug, warn, Span};

use crate::collector::config::{IdentityConfig, IdentityStrategy};
use crate::random::RandomSource;

/// Desktop browser profiles used when no pool is configured
pub const DEFAULT_USER_AGENTS: [&str; 8] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
];

const BASELINE_HEADERS: [(&str, &str); 5] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// Identity presented on a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User agent string
    pub user_agent: String,
    /// Complete header set, `User-Agent` first
    pub headers: Vec<(String, String)>,
}

impl Identity {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Supplies an identity per request from a non-empty pool
#[derive(Debug)]
pub struct IdentityRotator {
    pool: Vec<String>,
    cursor: usize,
    strategy: IdentityStrategy,
    cache_control_probability: f64,
    dnt_probability: f64,
    rng: RandomSource,
    span: Span,
}

impl IdentityRotator {
    /// Build a rotator; an empty configured pool falls back to [`DEFAULT_USER_AGENTS`]
    pub fn new(config: &IdentityConfig, rng: RandomSource) -> Self {
        let pool: Vec<String> = if config.user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            config.user_agents.clone()
        };

        Self {
            pool,
            cursor: 0,
            strategy: config.strategy,
            cache_control_probability: config.cache_control_probability,
            dnt_probability: config.dnt_probability,
            rng,
            span: Span::none(),
        }
    }

    /// Build a rotator over an explicit pool, falling back to the defaults when empty
    pub fn with_pool(pool: Vec<String>, strategy: IdentityStrategy, rng: RandomSource) -> Self {
        if pool.is_empty() {
            warn!("Empty identity pool supplied, using built-in user agents");
        }
        let config = IdentityConfig {
            user_agents: pool,
            strategy,
            ..IdentityConfig::default()
        };
        Self::new(&config, rng)
    }

    /// Emit events under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Pool size (always at least 1)
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Always false; the pool is never empty
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Configured strategy
    pub fn strategy(&self) -> IdentityStrategy {
        self.strategy
    }

    /// Uniformly random user agent
    pub fn pick_random(&mut self) -> &str {
        let idx = self.rng.index(self.pool.len());
        &self.pool[idx]
    }

    /// Advance the cursor and return the user agent it lands on
    pub fn rotate_next(&mut self) -> &str {
        self.cursor = (self.cursor + 1) % self.pool.len();
        &self.pool[self.cursor]
    }

    /// Pick a user agent per the configured strategy and build its headers
    pub fn next_identity(&mut self) -> Identity {
        let user_agent = match self.strategy {
            IdentityStrategy::Random => self.pick_random().to_string(),
            IdentityStrategy::RoundRobin => self.rotate_next().to_string(),
        };
        let identity = self.build_headers(&user_agent);
        debug!(
            parent: &self.span,
            user_agent = %identity.user_agent,
            header_count = identity.headers.len(),
            "Selected identity"
        );
        identity
    }

    /// Baseline browser headers plus randomly included optional ones
    pub fn build_headers(&mut self, user_agent: &str) -> Identity {
        let mut headers = Vec::with_capacity(BASELINE_HEADERS.len() + 3);
        headers.push(("User-Agent".to_string(), user_agent.to_string()));
        headers.extend(
            BASELINE_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        if self.rng.chance(self.cache_control_probability) {
            headers.push(("Cache-Control".to_string(), "max-age=0".to_string()));
        }
        if self.rng.chance(self.dnt_probability) {
            headers.push(("DNT".to_string(), "1".to_string()));
        }

        Identity {
            user_agent: user_agent.to_string(),
            headers,
        }
    }
}
