use crate::connection::{
    AggregateMetrics, ConnectionId, ConnectionRecord, IdAllocator, MetricsAggregator, Network,
    NetworkCounts,
};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Live registry of open transport connections.
///
/// Lives for the whole process and is shared by every listener.
#[derive(Debug)]
pub struct ConnectionRegistry {
    ids: IdAllocator,
    connections: DashMap<ConnectionId, Arc<ConnectionRecord>, RandomState>,
    open: AtomicUsize,
    metrics: MetricsAggregator,
}

/// Point-in-time view of historical metrics plus the currently open connections.
///
/// `metrics` may lag slightly behind the very latest close event.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub taken_at: Instant,
    pub metrics: Arc<AggregateMetrics>,
    pub dropped_metrics_events: u64,
    pub open_connections: Vec<Arc<ConnectionRecord>>,
    pub open_by_network: NetworkCounts,
}

impl ConnectionRegistry {
    pub fn new(metrics: MetricsAggregator) -> Self {
        Self {
            ids: IdAllocator::new(),
            connections: DashMap::with_hasher(RandomState::new()),
            open: AtomicUsize::new(0),
            metrics,
        }
    }

    /// Register a freshly accepted connection.
    pub fn add(&self, network: Network) -> Arc<ConnectionRecord> {
        let id = self.ids.next();
        let record = Arc::new(ConnectionRecord::new(id, network));

        self.connections.insert(id, record.clone());
        let open = self.open.fetch_add(1, Ordering::AcqRel) + 1;

        tracing::debug!(connection_id = %id, %network, open, "connection added");

        self.metrics.record_opened(network, open);

        record
    }

    /// Count one request against `id`. Unknown ids are ignored.
    pub fn increment_requests(&self, id: ConnectionId) {
        if let Some(record) = self.connections.get(&id) {
            record.increment_requests();
        }
    }

    /// Remove a closed connection. Removing an unknown id is a no-op.
    pub fn remove(&self, id: ConnectionId) {
        let Some((_, record)) = self.connections.remove(&id) else {
            return;
        };

        let previous = self.open.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "open connection count underflow");

        let closed = record.close();

        tracing::debug!(
            connection_id = %id,
            network = %closed.network,
            requests = closed.requests,
            lifetime_ms = closed.lifetime.as_millis() as u64,
            open = previous.saturating_sub(1),
            "connection removed"
        );

        self.metrics.record_closed(closed);
    }

    /// Enumerate currently open connections.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionRecord>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn state_snapshot(&self) -> StateSnapshot {
        let open_connections = self.snapshot();

        let mut open_by_network = NetworkCounts::default();
        for record in &open_connections {
            open_by_network.increment(record.network());
        }

        StateSnapshot {
            taken_at: Instant::now(),
            metrics: self.metrics.current(),
            dropped_metrics_events: self.metrics.dropped_events(),
            open_connections,
            open_by_network,
        }
    }
}
