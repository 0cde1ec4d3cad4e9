//! JSON-over-HTTP search source

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::collector::Identity;
use crate::query::Query;
use crate::source::extract::JsonPostExtractor;
use crate::source::{
    FetchError, FetchResult, Interstitial, ItemExtractor, PageCursor, PageFetcher, RawPage,
};
use crate::CandidateItem;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Left to the client so that compressed bodies are decoded transparently.
const CLIENT_MANAGED_HEADERS: [&str; 1] = ["accept-encoding"];

/// Fetches pages from `GET {base_url}?q={query}&cursor={token}`
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
    extractor: JsonPostExtractor,
}

impl HttpSource {
    /// Create a source for `base_url`
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidSource`] for an unparseable URL or a client build failure
    pub fn new(base_url: &str) -> FetchResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidSource(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::InvalidSource(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            extractor: JsonPostExtractor::new(),
        })
    }

    /// Endpoint URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn map_transport_error(error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_connect() {
            FetchError::Network(error.to_string())
        } else {
            FetchError::Http(error.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpSource {
    async fn fetch(
        &self,
        query: &Query,
        cursor: &PageCursor,
        identity: &Identity,
    ) -> FetchResult<RawPage> {
        let mut request = self
            .client
            .get(self.base_url.clone())
            .query(&[("q", query.search_term())]);
        if let Some(token) = &cursor.token {
            request = request.query(&[("cursor", token.as_str())]);
        }
        for (name, value) in &identity.headers {
            if CLIENT_MANAGED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(query = %query, page = cursor.page, url = %self.base_url, "Fetching page");

        let response = request.send().await.map_err(Self::map_transport_error)?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(Self::map_transport_error)?;
        Ok(RawPage::new(query.clone(), cursor.clone(), body))
    }

    fn probe_interstitial(&self, page: &RawPage) -> Option<Interstitial> {
        let parsed: Value = serde_json::from_str(&page.body).ok()?;
        if parsed.get("login_required").and_then(Value::as_bool) == Some(true) {
            return Some(Interstitial::LoginWall);
        }
        if parsed.get("captcha").and_then(Value::as_bool) == Some(true) {
            return Some(Interstitial::Captcha);
        }
        None
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl ItemExtractor for HttpSource {
    fn extract(&self, page: &RawPage) -> Vec<Option<CandidateItem>> {
        self.extractor.extract(page)
    }

    fn next_cursor(&self, page: &RawPage) -> Option<String> {
        self.extractor.next_cursor(page)
    }
}
