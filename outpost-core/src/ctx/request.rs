use crate::connection::{ConnectionId, Network};
use crate::ctx::RequestId;
use std::time::Instant;

/// Per-request state threaded from the connection loop into the API handlers.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    pub request_id: RequestId,
    pub connection_id: ConnectionId,
    pub network: Network,
    /// Peer address as reported by the socket, if any (unix peers are often unnamed).
    pub remote_address: Option<String>,
    pub started_at: Instant,
}

impl RequestCtx {
    pub fn new(
        connection_id: ConnectionId,
        network: Network,
        remote_address: Option<String>,
    ) -> Self {
        Self {
            request_id: RequestId::default(),
            connection_id,
            network,
            remote_address,
            started_at: Instant::now(),
        }
    }
}
