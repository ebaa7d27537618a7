use crate::connection::{ClosedConnection, Network, NetworkCounts};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Historical connection extrema.
///
/// Replaced wholesale on every fold. Max fields never decrease and the
/// minimum lifetime never increases once it is defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateMetrics {
    pub total_connections: u64,
    pub total_connections_by_network: NetworkCounts,
    pub max_open_connections: usize,
    /// `None` until at least one connection has closed.
    pub min_closed_connection_lifetime: Option<Duration>,
    pub max_closed_connection_lifetime: Duration,
    pub max_requests_per_closed_connection: u64,
    pub closed_connections: u64,
}

impl AggregateMetrics {
    pub fn fold_opened(&self, network: Network, open_connections: usize) -> Self {
        let mut next = self.clone();
        next.total_connections += 1;
        next.total_connections_by_network.increment(network);
        next.max_open_connections = next.max_open_connections.max(open_connections);
        next
    }

    pub fn fold_closed(&self, closed: &ClosedConnection) -> Self {
        let mut next = self.clone();
        next.min_closed_connection_lifetime = Some(match next.min_closed_connection_lifetime {
            Some(current) => current.min(closed.lifetime),
            None => closed.lifetime,
        });
        next.max_closed_connection_lifetime =
            next.max_closed_connection_lifetime.max(closed.lifetime);
        next.max_requests_per_closed_connection = next
            .max_requests_per_closed_connection
            .max(closed.requests);
        next.closed_connections += 1;
        next
    }
}

#[derive(Debug)]
enum MetricsEvent {
    Opened {
        network: Network,
        open_connections: usize,
    },
    Closed(ClosedConnection),
    Sync(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct PublishedMetrics {
    current: ArcSwap<AggregateMetrics>,
    dropped_events: AtomicU64,
}

/// Producer handle of the metrics actor.
///
/// Enqueueing never blocks: when the queue is full the event is dropped and
/// counted in [`MetricsAggregator::dropped_events`].
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    tx: mpsc::Sender<MetricsEvent>,
    published: Arc<PublishedMetrics>,
}

/// The single consumer folding queued events into [`AggregateMetrics`].
///
/// Must be spawned on a Tokio runtime; it exits once every
/// [`MetricsAggregator`] handle has been dropped.
#[derive(Debug)]
pub struct MetricsWorker {
    rx: mpsc::Receiver<MetricsEvent>,
    published: Arc<PublishedMetrics>,
}

impl MetricsAggregator {
    pub fn new(queue_capacity: usize) -> (Self, MetricsWorker) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let published = Arc::new(PublishedMetrics::default());

        (
            Self {
                tx,
                published: published.clone(),
            },
            MetricsWorker { rx, published },
        )
    }

    pub fn record_opened(&self, network: Network, open_connections: usize) {
        self.enqueue(MetricsEvent::Opened {
            network,
            open_connections,
        });
    }

    pub fn record_closed(&self, closed: ClosedConnection) {
        self.enqueue(MetricsEvent::Closed(closed));
    }

    /// Latest published aggregate. A single atomic load, never blocks.
    pub fn current(&self) -> Arc<AggregateMetrics> {
        self.published.current.load_full()
    }

    pub fn dropped_events(&self) -> u64 {
        self.published.dropped_events.load(Ordering::Relaxed)
    }

    /// Resolves once every event enqueued before this call has been folded.
    ///
    /// Returns immediately if the worker is no longer running.
    pub async fn sync(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(MetricsEvent::Sync(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    fn enqueue(&self, event: MetricsEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let dropped = self.published.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;

            // Only log on powers of two to keep a saturated queue from flooding the log.
            if dropped.is_power_of_two() {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "queue_full",
                    mpsc::error::TrySendError::Closed(_) => "worker_stopped",
                };
                tracing::warn!(dropped, reason, "connection metrics event dropped");
            }
        }
    }
}

impl MetricsWorker {
    pub async fn run(mut self) {
        tracing::debug!("connection metrics worker started");

        while let Some(event) = self.rx.recv().await {
            let current = self.published.current.load();

            let next = match event {
                MetricsEvent::Opened {
                    network,
                    open_connections,
                } => current.fold_opened(network, open_connections),
                MetricsEvent::Closed(closed) => current.fold_closed(&closed),
                MetricsEvent::Sync(ack) => {
                    let _ = ack.send(());
                    continue;
                }
            };

            self.published.current.store(Arc::new(next));
        }

        tracing::debug!("connection metrics worker stopped");
    }
}
