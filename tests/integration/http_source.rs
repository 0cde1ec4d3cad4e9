//! Integration tests for the HTTP source against a local mock server

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use social_collector::collector::{
    CollectionExecutor, CollectorConfig, DelayRange, Identity, Termination,
};
use social_collector::query::Query;
use social_collector::source::{
    FetchError, HttpSource, Interstitial, ItemExtractor, PageCursor, PageFetcher,
};

fn identity(agent: &str) -> Identity {
    Identity {
        user_agent: agent.to_string(),
        headers: vec![
            ("User-Agent".to_string(), agent.to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("Accept-Encoding".to_string(), "gzip, deflate".to_string()),
        ],
    }
}

fn page_body(ids: &[u32], next_cursor: Option<&str>) -> serde_json::Value {
    let posts: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id.to_string(),
                "author": "@desk",
                "content": format!("#nifty50 closes higher, note {id}"),
                "posted_at": Utc::now().to_rfc3339(),
                "likes": "1.5K",
            })
        })
        .collect();
    json!({ "posts": posts, "next_cursor": next_cursor })
}

/// Zero pacing so real network round-trips are not slowed down
fn fast_config() -> CollectorConfig {
    let mut config = CollectorConfig {
        seed: Some(5),
        ..CollectorConfig::default()
    };
    config.rate.base_delay = Duration::ZERO;
    config.rate.max_delay = Duration::from_millis(1);
    config.collection.think_time = DelayRange::fixed(Duration::ZERO);
    config.collection.query_pause = DelayRange::fixed(Duration::ZERO);
    config
}

#[tokio::test]
async fn test_fetch_and_extract_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "#nifty50"))
        .and(header("User-Agent", "agent-one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1, 2], Some("c2"))))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpSource::new(&format!("{}/search", server.uri())).unwrap();
    let query = Query::parse("#nifty50").unwrap();
    let page = source
        .fetch(&query, &PageCursor::start(), &identity("agent-one"))
        .await
        .unwrap();

    let items: Vec<_> = source.extract(&page).into_iter().flatten().collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].post.author, "desk");
    assert_eq!(items[0].post.likes, 1500);
    assert_eq!(source.next_cursor(&page).as_deref(), Some("c2"));
    assert!(source.probe_interstitial(&page).is_none());
}

#[tokio::test]
async fn test_cursor_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[3], None)))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpSource::new(&server.uri()).unwrap();
    let cursor = PageCursor::start().advance(Some("abc".to_string()));
    let page = source
        .fetch(&Query::parse("sensex").unwrap(), &cursor, &identity("ua"))
        .await
        .unwrap();
    assert_eq!(page.cursor.page, 1);
    assert_eq!(source.next_cursor(&page), None);
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("q", "broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpSource::new(&server.uri()).unwrap();
    let fetch = |q: &str| {
        let query = Query::parse(q).unwrap();
        let source = source.clone();
        async move {
            source
                .fetch(&query, &PageCursor::start(), &identity("ua"))
                .await
        }
    };

    assert_eq!(fetch("limited").await.unwrap_err(), FetchError::RateLimited);
    assert_eq!(fetch("broken").await.unwrap_err(), FetchError::Status(503));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Reserve a free port, then release it so nothing is listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let source = HttpSource::new(&format!("http://127.0.0.1:{port}/search")).unwrap();
    let result = source
        .fetch(&Query::parse("x").unwrap(), &PageCursor::start(), &identity("ua"))
        .await;
    assert!(
        matches!(result, Err(FetchError::Network(_))),
        "unexpected result: {result:?}"
    );
}

#[tokio::test]
async fn test_login_wall_detected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "login_required": true, "posts": [] })),
        )
        .mount(&server)
        .await;

    let source = HttpSource::new(&server.uri()).unwrap();
    let page = source
        .fetch(&Query::parse("#nifty50").unwrap(), &PageCursor::start(), &identity("ua"))
        .await
        .unwrap();
    assert_eq!(source.probe_interstitial(&page), Some(Interstitial::LoginWall));
    assert!(source.extract(&page).is_empty());
}

#[tokio::test]
async fn test_executor_pages_through_http_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("cursor", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[3, 4], Some("p3"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cursor", "p3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    // Lowest priority: the first page has no cursor parameter
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1, 2], Some("p2"))))
        .with_priority(10)
        .mount(&server)
        .await;

    let source = Arc::new(HttpSource::new(&server.uri()).unwrap());
    let report = CollectionExecutor::new(source, fast_config())
        .collect(&[Query::parse("#nifty50").unwrap()])
        .await
        .unwrap();

    assert_eq!(report.items.len(), 4);
    assert_eq!(report.queries[0].pages_fetched, 2);
    assert_eq!(
        report.queries[0].termination,
        Termination::FetchFailed(FetchError::Status(500).to_string())
    );
    assert_eq!(report.stats.failed_requests, 1);
    assert_eq!(report.stats.rate.consecutive_failures, 1);
}
