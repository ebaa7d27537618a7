use crate::api::{ApiHandler, ApiResponse};
use crate::connection::{ConnectionGuard, Network};
use crate::ctx::RequestCtx;
use crate::logging::ACCESS_LOG_TARGET;
use async_trait::async_trait;
use http::{Method, StatusCode};
use pingora::apps::ServerApp;
use pingora::protocols::http::ServerSession;
use pingora::protocols::http::v2::server::{self as h2_server, HttpSession as H2Session};
use pingora::protocols::{Digest, GetSocketDigest, Peek, Stream};
use pingora::server::ShutdownWatch;
use std::future::poll_fn;
use std::io;
use std::sync::Arc;

// https://datatracker.ietf.org/doc/html/rfc9113#section-3.4
const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// HTTP application for one listener.
///
/// Every accepted stream is registered for as long as any of its requests
/// is in flight; the guard removes it again no matter how the connection ends.
/// With `h2c` set, connections opening with the HTTP/2 preface are served as
/// HTTP/2 and every other connection falls back to HTTP/1.x.
pub struct TrackedHttpApp {
    network: Network,
    keepalive_seconds: u64,
    h2c: bool,
    handler: Arc<ApiHandler>,
}

impl TrackedHttpApp {
    pub fn new(
        network: Network,
        keepalive_seconds: u64,
        h2c: bool,
        handler: Arc<ApiHandler>,
    ) -> Self {
        Self {
            network,
            keepalive_seconds,
            h2c,
            handler,
        }
    }

    /// Serve the request already read into `session`.
    async fn serve(&self, session: &mut ServerSession, guard: &ConnectionGuard) {
        let remote_address = session.client_addr().map(|addr| addr.to_string());
        let ctx = RequestCtx::new(guard.id(), self.network, remote_address);

        let method = session.req_header().method.clone();
        let path = session.req_header().uri.path().to_owned();

        let response = match session.read_request_body().await {
            Ok(Some(chunk)) if !chunk.is_empty() => {
                // The rest of the body is never drained, so the stream cannot be reused.
                session.set_keepalive(None);
                ApiResponse::body_not_allowed()
            }
            Ok(_) => self.handler.handle(session.req_header(), &ctx).await,
            Err(err) => {
                tracing::debug!(connection_id = %ctx.connection_id, error = %err, "failed to read request body");
                session.set_keepalive(None);
                ApiResponse::error(StatusCode::BAD_REQUEST, "failed to read request body")
            }
        };

        if let Err(err) = write_response(session, &response).await {
            tracing::debug!(
                connection_id = %ctx.connection_id,
                request_id = %ctx.request_id,
                error = %err,
                "failed to write response"
            );
        }

        tracing::info!(
            target: ACCESS_LOG_TARGET,
            request_id = %ctx.request_id,
            connection_id = %ctx.connection_id,
            network = %ctx.network,
            remote_address = ctx.remote_address.as_deref().unwrap_or("-"),
            method = %method,
            path = %path,
            status = response.status.as_u16(),
            duration_us = ctx.started_at.elapsed().as_micros() as u64,
        );
    }
}

async fn write_response(session: &mut ServerSession, response: &ApiResponse) -> pingora::Result<()> {
    let header = response.response_header()?;
    session.write_response_header(Box::new(header)).await?;

    // HEAD keeps the GET headers, including content-length, but sends no body.
    // `finish` ends the exchange for both protocols.
    if session.req_header().method == Method::HEAD {
        return Ok(());
    }

    session
        .write_response_body(response.body.clone(), true)
        .await?;
    Ok(())
}

/// Peek at the first bytes without consuming them.
async fn has_h2_preface(stream: &mut Stream) -> io::Result<bool> {
    let mut buf = [0u8; H2_PREFACE.len()];
    // Streams that cannot peek stay on HTTP/1.
    let peeked = stream.try_peek(&mut buf).await?;
    Ok(peeked && buf == H2_PREFACE)
}

impl TrackedHttpApp {
    async fn serve_http1(
        &self,
        mut stream: Stream,
        guard: &ConnectionGuard,
        shutdown: &ShutdownWatch,
    ) {
        loop {
            let mut session = ServerSession::new_http1(stream);
            session.set_keepalive(Some(self.keepalive_seconds));

            match session.read_request().await {
                Ok(true) => {}
                // Peer closed or idled out between requests.
                Ok(false) => break,
                Err(err) => {
                    tracing::debug!(connection_id = %guard.id(), error = %err, "failed to read request");
                    break;
                }
            }

            guard.on_request();
            self.serve(&mut session, guard).await;

            if *shutdown.borrow() {
                session.set_keepalive(None);
            }

            match session.finish().await {
                Ok(Some(next)) => stream = next,
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(connection_id = %guard.id(), error = %err, "failed to finish session");
                    break;
                }
            }
        }
    }

    /// Accept streams until the peer closes the connection or the server shuts down.
    /// Each stream is served on its own task holding a share of the guard.
    async fn serve_http2(
        self: &Arc<Self>,
        stream: Stream,
        guard: Arc<ConnectionGuard>,
        shutdown: &ShutdownWatch,
    ) {
        let digest = Arc::new(Digest {
            socket_digest: stream.get_socket_digest(),
            ..Default::default()
        });

        let mut conn = match h2_server::handshake(stream, None).await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::debug!(connection_id = %guard.id(), error = %err, "h2 handshake failed");
                return;
            }
        };

        let mut shutdown = shutdown.clone();
        loop {
            let accepted = tokio::select! {
                _ = shutdown.changed() => {
                    conn.graceful_shutdown();
                    if let Err(err) = poll_fn(|cx| conn.poll_closed(cx)).await {
                        tracing::debug!(connection_id = %guard.id(), error = %err, "h2 shutdown failed");
                    }
                    return;
                }
                accepted = H2Session::from_h2_conn(&mut conn, digest.clone()) => accepted,
            };

            let h2_stream = match accepted {
                Ok(Some(h2_stream)) => h2_stream,
                // Peer is done with the connection.
                Ok(None) => return,
                Err(err) => {
                    tracing::debug!(connection_id = %guard.id(), error = %err, "failed to accept h2 stream");
                    return;
                }
            };

            guard.on_request();

            let app = self.clone();
            let guard = guard.clone();
            tokio::spawn(async move {
                let mut session = ServerSession::new_http2(h2_stream);
                app.serve(&mut session, &guard).await;
                if let Err(err) = session.finish().await {
                    tracing::debug!(connection_id = %guard.id(), error = %err, "failed to finish h2 stream");
                }
            });
        }
    }
}

#[async_trait]
impl ServerApp for TrackedHttpApp {
    async fn process_new(
        self: &Arc<Self>,
        mut stream: Stream,
        shutdown: &ShutdownWatch,
    ) -> Option<Stream> {
        let guard = Arc::new(ConnectionGuard::register(
            self.handler.registry().clone(),
            self.network,
        ));

        let h2 = if self.h2c {
            match has_h2_preface(&mut stream).await {
                Ok(h2) => h2,
                Err(err) => {
                    // Normal for a peer that connects and closes without a request.
                    tracing::debug!(connection_id = %guard.id(), error = %err, "failed to read connection preface");
                    return None;
                }
            }
        } else {
            false
        };

        if h2 {
            self.serve_http2(stream, guard, shutdown).await;
        } else {
            self.serve_http1(stream, &guard, shutdown).await;
        }

        // Connection is done; the last guard drop removes it from the registry.
        None
    }

    async fn cleanup(&self) {
        self.handler.commands().gate().close();

        let metrics = self.handler.registry().metrics();
        metrics.sync().await;
        let current = metrics.current();

        tracing::info!(
            network = %self.network,
            total_connections = current.total_connections,
            closed_connections = current.closed_connections,
            max_open_connections = current.max_open_connections,
            dropped_metrics_events = metrics.dropped_events(),
            "listener stopped"
        );
    }
}
