//! Integration tests for batch collection runs

use std::collections::HashSet;
use std::sync::Arc;

use social_collector::collector::identity::DEFAULT_USER_AGENTS;
use social_collector::collector::{
    CollectionExecutor, CollectorConfig, CollectorError, IdentityStrategy, Termination,
};
use social_collector::query::Query;
use social_collector::source::{MockSource, MockSourceConfig};

fn queries(raw: &[&str]) -> Vec<Query> {
    Query::parse_all(raw).unwrap()
}

fn seeded_config(seed: u64) -> CollectorConfig {
    CollectorConfig {
        seed: Some(seed),
        ..CollectorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_collects_every_query_with_shared_dedup() {
    let source = Arc::new(MockSource::default());
    let executor = CollectionExecutor::new(source.clone(), seeded_config(1));

    let report = executor
        .collect(&queries(&["#nifty50", "sensex"]))
        .await
        .unwrap();

    // Five unique pages of ten posts per query, then repeats until the ceiling
    assert_eq!(report.items.len(), 100);
    assert_eq!(report.unique_fingerprints, 100);
    assert!(report.is_complete(2));
    for summary in &report.queries {
        assert_eq!(summary.items, 50);
        assert_eq!(summary.pages_fetched, 10);
        assert_eq!(summary.termination, Termination::IterationCeiling);
        assert_eq!(summary.rejected.duplicates, 50);
    }

    let fingerprints: HashSet<_> = report.items.iter().map(|i| &i.fingerprint).collect();
    assert_eq!(fingerprints.len(), report.items.len());

    // Items come back in query order
    assert!(report.items[..50].iter().all(|i| i.query == "#nifty50"));
    assert!(report.items[50..].iter().all(|i| i.query == "sensex"));

    assert_eq!(report.stats.total_requests, 20);
    assert_eq!(report.stats.successful_requests, 20);
    assert_eq!(source.fetch_count(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_limits_from_config() {
    let mut config = seeded_config(2);
    config.collection.max_items_per_query = 25;
    let executor = CollectionExecutor::new(Arc::new(MockSource::default()), config);

    let report = executor.collect(&queries(&["#banknifty"])).await.unwrap();
    assert_eq!(report.items.len(), 25);
    assert_eq!(report.queries[0].pages_fetched, 3);
    assert_eq!(report.queries[0].termination, Termination::TargetReached);
}

#[tokio::test(start_paused = true)]
async fn test_failures_end_only_the_affected_query() {
    let source = Arc::new(MockSource::new(MockSourceConfig {
        fail_every: 3,
        ..MockSourceConfig::default()
    }));
    let executor = CollectionExecutor::new(source.clone(), seeded_config(3));

    let report = executor
        .collect(&queries(&["#nifty50", "#sensex"]))
        .await
        .unwrap();

    assert!(report.is_complete(2));
    // Fetch #3 fails the first query after two pages; #6 fails the second after two more
    assert!(matches!(
        report.queries[0].termination,
        Termination::FetchFailed(_)
    ));
    assert_eq!(report.queries[0].items, 20);
    assert!(matches!(
        report.queries[1].termination,
        Termination::FetchFailed(_)
    ));
    assert_eq!(report.queries[1].items, 20);
    assert_eq!(report.stats.failed_requests, 2);
    assert_eq!(report.stats.successful_requests, 4);
}

#[tokio::test(start_paused = true)]
async fn test_seeded_runs_are_reproducible() {
    let run = |seed| async move {
        let source = Arc::new(MockSource::default());
        let mut config = seeded_config(seed);
        config.collection.max_iterations_per_query = 4;
        let executor = CollectionExecutor::new(source.clone(), config);
        let report = executor.collect(&queries(&["#nifty50"])).await.unwrap();
        let ids: Vec<String> = report.items.into_iter().map(|i| i.post.post_id).collect();
        (ids, source.seen_user_agents())
    };

    let (ids_a, agents_a) = run(11).await;
    let (ids_b, agents_b) = run(11).await;
    assert_eq!(ids_a, ids_b);
    assert_eq!(agents_a, agents_b);
    assert_eq!(agents_a.len(), 4);
    assert!(agents_a
        .iter()
        .all(|ua| DEFAULT_USER_AGENTS.contains(&ua.as_str())));
}

#[tokio::test(start_paused = true)]
async fn test_round_robin_identities_reach_source() {
    let source = Arc::new(MockSource::default());
    let mut config = seeded_config(4);
    config.identity.strategy = IdentityStrategy::RoundRobin;
    config.identity.user_agents = vec!["ua-1".to_string(), "ua-2".to_string()];
    config.collection.max_iterations_per_query = 3;

    CollectionExecutor::new(source.clone(), config)
        .collect(&queries(&["#nifty50", "sensex"]))
        .await
        .unwrap();

    assert_eq!(
        source.seen_user_agents(),
        vec!["ua-2", "ua-1", "ua-2", "ua-1", "ua-2", "ua-1"]
    );
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let executor =
        CollectionExecutor::new(Arc::new(MockSource::default()), CollectorConfig::default());
    assert!(matches!(
        executor.collect(&[]).await,
        Err(CollectorError::NoQueries)
    ));

    let mut config = CollectorConfig::default();
    config.collection.max_iterations_per_query = 0;
    let executor = CollectionExecutor::new(Arc::new(MockSource::default()), config);
    assert!(matches!(
        executor.collect(&queries(&["#nifty50"])).await,
        Err(CollectorError::InvalidConfig(_))
    ));
}
