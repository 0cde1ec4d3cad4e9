use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use social_collector::collector::{CollectionExecutor, CollectorConfig, StreamWatcher, Termination};
use social_collector::query::Query;
use social_collector::shutdown::{ShutdownCoordinator, StopSignal};
use social_collector::source::MockSource;

#[tokio::test]
async fn shutdown_notifies_waiters() {
    let shutdown = ShutdownCoordinator::shared();
    let waiter = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            handle.wait_for_shutdown().await;
            true
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

/// A request made before anyone waits must still release later waiters.
#[tokio::test]
async fn shutdown_requested_before_wait_does_not_block() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let handle = shutdown.clone();
    let waiter = tokio::spawn(async move {
        handle.wait_for_shutdown().await;
        true
    });

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok(), "wait_for_shutdown() blocked after shutdown was requested");
}

#[tokio::test(start_paused = true)]
async fn stop_signal_pause_is_cut_short() {
    let shutdown = ShutdownCoordinator::shared();
    let stop = StopSignal::new().with_shutdown(shutdown.clone());

    let trigger = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            shutdown.request_shutdown();
        })
    };

    let started = tokio::time::Instant::now();
    assert!(!stop.pause(Duration::from_secs(60)).await);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(stop.is_triggered());
    trigger.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_signal_deadline_clamps_pause() {
    let stop = StopSignal::new().with_deadline(tokio::time::Instant::now() + Duration::from_secs(10));

    assert!(stop.pause(Duration::from_secs(4)).await);
    assert!(!stop.pause(Duration::from_secs(30)).await);
    assert!(stop.is_triggered());
    assert!(!stop.pause(Duration::from_secs(1)).await);
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_batch_skips_remaining_queries() {
    let shutdown = ShutdownCoordinator::shared();
    let source = Arc::new(MockSource::default());
    let config = CollectorConfig {
        seed: Some(1),
        ..CollectorConfig::default()
    };

    let trigger = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            // Lands inside the first query, which runs for at least 18s of think time
            tokio::time::sleep(Duration::from_secs(10)).await;
            shutdown.request_shutdown();
        })
    };

    let report = CollectionExecutor::new(source.clone(), config)
        .with_shutdown(shutdown)
        .collect(&Query::parse_all(&["#nifty50", "sensex", "#banknifty"]).unwrap())
        .await
        .unwrap();
    trigger.await.unwrap();

    assert_eq!(report.queries.len(), 1);
    assert!(!report.is_complete(3));
    assert_eq!(report.queries[0].termination, Termination::Interrupted);
    assert!(!report.items.is_empty());
    assert!(source.fetch_count() < 10);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_watch_yields_nothing() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    let source = Arc::new(MockSource::default());

    let items: Vec<_> = StreamWatcher::new(source.clone(), CollectorConfig::default())
        .with_shutdown(shutdown)
        .watch(vec![Query::parse("#nifty50").unwrap()], Duration::from_secs(600))
        .collect()
        .await;

    assert!(items.is_empty());
    assert_eq!(source.fetch_count(), 0);
}
