use crate::connection::ConnectionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Transport a connection was accepted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Unix,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Unix => "unix",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-network counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkCounts {
    pub tcp: u64,
    pub unix: u64,
}

impl NetworkCounts {
    pub fn increment(&mut self, network: Network) {
        match network {
            Network::Tcp => self.tcp += 1,
            Network::Unix => self.unix += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tcp + self.unix
    }
}

/// Mutable state of one open connection.
///
/// Invariants:
/// - `requests` only ever increases
/// - `closed_at` is stamped exactly once, by the registry, on removal
#[derive(Debug)]
pub struct ConnectionRecord {
    id: ConnectionId,
    network: Network,
    created_at: Instant,
    created_at_wall: DateTime<Utc>,
    requests: AtomicU64,
    closed_at: OnceLock<Instant>,
}

impl ConnectionRecord {
    pub(crate) fn new(id: ConnectionId, network: Network) -> Self {
        Self {
            id,
            network,
            created_at: Instant::now(),
            created_at_wall: Utc::now(),
            requests: AtomicU64::new(0),
            closed_at: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn created_at_wall(&self) -> DateTime<Utc> {
        self.created_at_wall
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn closed_at(&self) -> Option<Instant> {
        self.closed_at.get().copied()
    }

    pub(crate) fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Stamp the close time and freeze the record into a [`ClosedConnection`].
    pub(crate) fn close(&self) -> ClosedConnection {
        let stamped = self.closed_at.set(Instant::now());
        debug_assert!(stamped.is_ok(), "connection {} closed twice", self.id);

        let closed_at = self.closed_at().unwrap_or(self.created_at);

        ClosedConnection {
            id: self.id,
            network: self.network,
            lifetime: closed_at.saturating_duration_since(self.created_at),
            requests: self.requests(),
        }
    }
}

/// Immutable facts about a connection that has been removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedConnection {
    pub id: ConnectionId,
    pub network: Network,
    pub lifetime: Duration,
    pub requests: u64,
}
