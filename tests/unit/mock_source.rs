//! Unit tests for the synthetic source

use chrono::{Duration as ChronoDuration, Utc};
use social_collector::collector::Identity;
use social_collector::query::Query;
use social_collector::source::{
    create_source, FetchError, MockSourceConfig, PageCursor, SourceKind,
};

fn identity(agent: &str) -> Identity {
    Identity {
        user_agent: agent.to_string(),
        headers: vec![("User-Agent".to_string(), agent.to_string())],
    }
}

#[tokio::test]
async fn test_mock_pages_through_trait_object() {
    let source = create_source(&SourceKind::mock()).unwrap();
    let query = Query::parse("#nifty50").unwrap();

    let page = source
        .fetch(&query, &PageCursor::start(), &identity("ua"))
        .await
        .unwrap();
    let items: Vec<_> = source.extract(&page).into_iter().flatten().collect();

    assert_eq!(items.len(), 10);
    assert_eq!(source.next_cursor(&page).as_deref(), Some("page-1"));
    assert!(source.probe_interstitial(&page).is_none());

    let oldest_allowed = Utc::now() - ChronoDuration::hours(24);
    for item in &items {
        assert!(item.post.content.contains("#nifty50"));
        assert!(item.post.posted_at > oldest_allowed);
        assert!(item.post.hashtags.contains(&"#markets".to_string()));
    }
}

#[tokio::test]
async fn test_queries_do_not_share_content() {
    let source = create_source(&SourceKind::mock()).unwrap();
    let cursor = PageCursor::start();
    let fingerprints = |page| {
        source
            .extract(&page)
            .into_iter()
            .flatten()
            .map(|c| c.fingerprint)
            .collect::<Vec<_>>()
    };

    let a = source
        .fetch(&Query::parse("#sensex").unwrap(), &cursor, &identity("ua"))
        .await
        .unwrap();
    let b = source
        .fetch(&Query::parse("banknifty").unwrap(), &cursor, &identity("ua"))
        .await
        .unwrap();

    let a = fingerprints(a);
    let b = fingerprints(b);
    assert!(a.iter().all(|f| !b.contains(f)));
}

#[tokio::test]
async fn test_every_fetch_fails_when_configured() {
    let source = create_source(&SourceKind::Mock(MockSourceConfig {
        fail_every: 1,
        ..MockSourceConfig::default()
    }))
    .unwrap();
    let query = Query::parse("#nifty50").unwrap();

    for _ in 0..3 {
        let result = source
            .fetch(&query, &PageCursor::start(), &identity("ua"))
            .await;
        assert!(matches!(result, Err(FetchError::Injected(_))));
    }
}

#[tokio::test]
async fn test_seed_changes_content() {
    let query = Query::parse("#nifty50").unwrap();
    let authors = |seed: u64| {
        let query = query.clone();
        async move {
            let source = create_source(&SourceKind::Mock(MockSourceConfig {
                seed,
                ..MockSourceConfig::default()
            }))
            .unwrap();
            let page = source
                .fetch(&query, &PageCursor::start(), &identity("ua"))
                .await
                .unwrap();
            source
                .extract(&page)
                .into_iter()
                .flatten()
                .map(|c| c.post.author)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(authors(1).await, authors(1).await);
    assert_ne!(authors(1).await, authors(2).await);
}
