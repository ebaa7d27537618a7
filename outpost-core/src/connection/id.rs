use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one accepted transport connection.
///
/// Ids are never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock-free allocator of strictly increasing connection ids.
///
/// Each allocator owns its own counter, so independent instances never
/// influence one another. The first id handed out is `1`.
#[derive(Debug, Default)]
pub struct IdAllocator {
    previous: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            previous: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.previous.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
