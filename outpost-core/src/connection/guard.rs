use crate::connection::{ConnectionId, ConnectionRecord, ConnectionRegistry, Network};
use std::sync::Arc;

/// RAII registration of one accepted connection.
///
/// Invariants:
/// - The connection is added to the registry when the guard is created
/// - It is removed exactly once, when the guard is dropped
#[derive(Debug)]
pub struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    record: Arc<ConnectionRecord>,
}

impl ConnectionGuard {
    pub fn register(registry: Arc<ConnectionRegistry>, network: Network) -> Self {
        let record = registry.add(network);
        Self { registry, record }
    }

    pub fn id(&self) -> ConnectionId {
        self.record.id()
    }

    pub fn record(&self) -> &Arc<ConnectionRecord> {
        &self.record
    }

    pub fn on_request(&self) {
        self.registry.increment_requests(self.record.id());
    }
}

impl Drop for ConnectionGuard {
    /// Covers normal close, I/O errors, panics and cancelled futures alike.
    fn drop(&mut self) {
        self.registry.remove(self.record.id());
    }
}
