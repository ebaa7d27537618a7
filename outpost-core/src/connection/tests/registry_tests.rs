use crate::connection::{
    ConnectionGuard, ConnectionId, ConnectionRegistry, MetricsAggregator, Network, NetworkCounts,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------
// Helpers
// ---------------------------

fn registry() -> (Arc<ConnectionRegistry>, tokio::task::JoinHandle<()>) {
    let (aggregator, worker) = MetricsAggregator::new(8192);
    let handle = tokio::spawn(worker.run());
    (Arc::new(ConnectionRegistry::new(aggregator)), handle)
}

fn ids(registry: &ConnectionRegistry) -> Vec<ConnectionId> {
    let mut ids: Vec<_> = registry.snapshot().iter().map(|r| r.id()).collect();
    ids.sort();
    ids
}

// ---------------------------
// Tests
// ---------------------------

#[tokio::test]
async fn add_then_remove_updates_snapshot_but_not_totals() {
    let (registry, _worker) = registry();

    let record = registry.add(Network::Tcp);
    assert_eq!(ids(&registry), vec![record.id()]);
    assert_eq!(registry.open_connections(), 1);

    registry.remove(record.id());
    assert!(registry.snapshot().is_empty());
    assert_eq!(registry.open_connections(), 0);
    assert!(record.closed_at().is_some());

    registry.metrics().sync().await;
    let state = registry.state_snapshot();
    assert_eq!(state.metrics.total_connections, 1);
    assert_eq!(state.metrics.closed_connections, 1);
    assert!(state.metrics.min_closed_connection_lifetime.is_some());
}

#[tokio::test]
async fn remove_is_idempotent() {
    let (registry, _worker) = registry();

    let a = registry.add(Network::Tcp);
    let b = registry.add(Network::Unix);

    registry.remove(a.id());
    registry.remove(a.id());
    registry.remove(ConnectionId(9_999));

    assert_eq!(registry.open_connections(), 1);
    assert_eq!(ids(&registry), vec![b.id()]);

    registry.metrics().sync().await;
    assert_eq!(registry.state_snapshot().metrics.closed_connections, 1);
}

#[tokio::test]
async fn requests_are_counted_until_removal() {
    let (registry, _worker) = registry();

    let record = registry.add(Network::Tcp);
    for _ in 0..5 {
        registry.increment_requests(record.id());
    }
    assert_eq!(record.requests(), 5);

    registry.remove(record.id());
    registry.increment_requests(record.id());
    assert_eq!(record.requests(), 5);

    registry.metrics().sync().await;
    assert_eq!(
        registry
            .state_snapshot()
            .metrics
            .max_requests_per_closed_connection,
        5
    );
}

#[tokio::test]
async fn max_open_never_decreases() {
    let (registry, _worker) = registry();

    let first: Vec<_> = (0..4).map(|_| registry.add(Network::Tcp)).collect();
    for record in &first {
        registry.remove(record.id());
    }

    let second = registry.add(Network::Tcp);
    registry.metrics().sync().await;

    let state = registry.state_snapshot();
    assert_eq!(state.metrics.max_open_connections, 4);
    assert_eq!(state.metrics.total_connections, 5);
    assert_eq!(ids(&registry), vec![second.id()]);
}

#[tokio::test]
async fn state_snapshot_counts_open_by_network() {
    let (registry, _worker) = registry();

    registry.add(Network::Tcp);
    registry.add(Network::Tcp);
    let unix = registry.add(Network::Unix);
    registry.add(Network::Unix);
    registry.remove(unix.id());

    registry.metrics().sync().await;
    let state = registry.state_snapshot();

    assert_eq!(state.open_by_network, NetworkCounts { tcp: 2, unix: 1 });
    assert_eq!(
        state.metrics.total_connections_by_network,
        NetworkCounts { tcp: 2, unix: 2 }
    );
    assert_eq!(state.dropped_metrics_events, 0);
}

#[tokio::test]
async fn guard_removes_on_drop() {
    let (registry, _worker) = registry();

    let guard = ConnectionGuard::register(registry.clone(), Network::Unix);
    guard.on_request();
    guard.on_request();
    assert_eq!(registry.open_connections(), 1);

    let record = guard.record().clone();
    drop(guard);

    assert_eq!(registry.open_connections(), 0);
    assert_eq!(record.requests(), 2);
    assert!(record.closed_at().is_some());
}

#[tokio::test]
async fn lifetimes_are_measured_between_add_and_remove() {
    let (registry, _worker) = registry();

    let short = registry.add(Network::Tcp);
    let long = registry.add(Network::Tcp);

    tokio::time::sleep(Duration::from_millis(5)).await;
    registry.remove(short.id());
    tokio::time::sleep(Duration::from_millis(30)).await;
    registry.remove(long.id());

    registry.metrics().sync().await;
    let metrics = registry.state_snapshot().metrics;

    let min = metrics.min_closed_connection_lifetime.unwrap();
    assert!(min >= Duration::from_millis(5));
    assert!(metrics.max_closed_connection_lifetime >= Duration::from_millis(35));
    assert!(min < metrics.max_closed_connection_lifetime);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_churn_keeps_counts_consistent() {
    let (registry, _worker) = registry();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let record = registry.add(Network::Tcp);
                    registry.increment_requests(record.id());
                    tokio::task::yield_now().await;
                    registry.remove(record.id());
                    // Racing increment after removal must be harmless.
                    registry.increment_requests(record.id());
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    registry.metrics().sync().await;
    let state = registry.state_snapshot();

    assert_eq!(registry.open_connections(), 0);
    assert!(state.open_connections.is_empty());
    assert_eq!(state.metrics.total_connections, 800);
    assert_eq!(state.metrics.closed_connections, 800);
    assert_eq!(state.metrics.max_requests_per_closed_connection, 1);
    assert!(state.metrics.max_open_connections >= 1);
    assert!(state.metrics.max_open_connections <= 8);
}
