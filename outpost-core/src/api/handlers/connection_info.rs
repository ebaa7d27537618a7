use crate::connection::{ConnectionId, ConnectionRecord, Network, NetworkCounts, StateSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub struct ConnectionDto {
    pub id: ConnectionId,
    pub network: Network,
    pub age: String,
    pub creation_time: DateTime<Utc>,
    pub requests: u64,
}

impl ConnectionDto {
    fn new(record: &ConnectionRecord, now: Instant) -> Self {
        Self {
            id: record.id(),
            network: record.network(),
            age: format_duration(record.age(now)),
            creation_time: record.created_at_wall(),
            requests: record.requests(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionCountsDto {
    pub total: u64,
    pub by_network: NetworkCounts,
}

impl From<NetworkCounts> for ConnectionCountsDto {
    fn from(counts: NetworkCounts) -> Self {
        Self {
            total: counts.total(),
            by_network: counts,
        }
    }
}

/// Body of the `connection_info` endpoint.
#[derive(Debug, Serialize)]
pub struct ConnectionInfoDto {
    pub max_open_connections: usize,
    /// `None` until at least one connection has closed.
    pub min_connection_lifetime: Option<String>,
    pub max_connection_lifetime: String,
    pub max_requests_per_connection: u64,
    pub closed_connections: u64,
    pub dropped_metrics_events: u64,
    pub current_connection_counts: ConnectionCountsDto,
    pub total_connection_counts: ConnectionCountsDto,
    /// Newest first.
    pub current_connections: Vec<ConnectionDto>,
}

impl ConnectionInfoDto {
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
        let metrics = &snapshot.metrics;

        let mut current_connections: Vec<_> = snapshot
            .open_connections
            .iter()
            .map(|record| ConnectionDto::new(record, snapshot.taken_at))
            .collect();
        current_connections.sort_by(|a, b| b.id.cmp(&a.id));

        Self {
            max_open_connections: metrics.max_open_connections,
            min_connection_lifetime: metrics.min_closed_connection_lifetime.map(format_duration),
            max_connection_lifetime: format_duration(metrics.max_closed_connection_lifetime),
            max_requests_per_connection: metrics.max_requests_per_closed_connection,
            closed_connections: metrics.closed_connections,
            dropped_metrics_events: snapshot.dropped_metrics_events,
            current_connection_counts: snapshot.open_by_network.into(),
            total_connection_counts: metrics.total_connections_by_network.into(),
            current_connections,
        }
    }
}

/// Render a duration in seconds, truncated to millisecond precision: `"1.234s"`.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}
