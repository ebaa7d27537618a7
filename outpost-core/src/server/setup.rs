use crate::api::ApiHandler;
use crate::conf::OutpostConfig;
use crate::conf::types::ListenerConfig;
use crate::connection::Network;
use crate::server::app::TrackedHttpApp;
use crate::server::runtime::{RuntimeState, build_runtime_state};
use crate::static_files::StaticFileServer;
use anyhow::{Context, Result};
use pingora::server::{RunArgs, Server};
use pingora::server::configuration::ServerConf;
use pingora::services::listening::Service;
use std::io;
use std::sync::Arc;
use tokio::runtime::Builder;

/// Run the Pingora server with the given configuration until a shutdown signal arrives.
pub fn run(cfg: OutpostConfig) -> Result<()> {
    // Control-plane runtime (metrics aggregation only)
    let control_rt = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("outpost-control")
        .enable_all()
        .build()
        .context("failed to build control-plane Tokio runtime")?;

    let state = build_runtime_state(&cfg, control_rt.handle());

    // Build Pingora server (Pingora owns its own runtimes)
    let server = build_pingora_server(&cfg, &state)?;

    tracing::info!(
        listeners = cfg.server.listeners.len(),
        api_context = %cfg.server.api_context,
        commands = state.commands.catalog().len(),
        "starting outpost"
    );

    // IMPORTANT:
    // - control_rt must stay in scope so its worker thread lives
    // - run blocks the main thread until SIGINT/SIGTERM, then returns so the
    //   caller's log guard can flush
    server.run(RunArgs::default());

    tracing::info!("outpost stopped");
    Ok(())
}

/// Build the Pingora server with one listening service per configured listener.
pub fn build_pingora_server(cfg: &OutpostConfig, state: &RuntimeState) -> Result<Server> {
    let mut server = if let Some(threads) = cfg.server.threads {
        tracing::debug!(
            threads,
            "Creating Pingora server with overridden worker threads"
        );
        let mut conf = ServerConf::new().context("could not construct pingora server configuration")?;
        conf.threads = threads;
        Server::new_with_opt_and_conf(None, conf)
    } else {
        // "None" is required here to truly tell Pingora to use its default settings.
        Server::new(None)?
    };

    server.bootstrap();

    let mut handler = ApiHandler::new(
        cfg.server.api_context.clone(),
        state.registry.clone(),
        state.commands.clone(),
    );
    if let Some(static_cfg) = &cfg.static_files {
        let static_files = StaticFileServer::new(static_cfg)
            .context("static_files.cache_control is not a valid header value")?;
        tracing::debug!(root = %static_cfg.root_path.display(), "serving static files");
        handler = handler.with_static_files(static_files);
    }
    let handler = Arc::new(handler);

    for (index, listener) in cfg.server.listeners.iter().enumerate() {
        let app = TrackedHttpApp::new(
            listener.network,
            cfg.server.keepalive_seconds,
            listener.h2c,
            handler.clone(),
        );
        let mut svc = Service::new(format!("outpost {} listener {index}", listener.network), app);
        add_listener(&mut svc, listener)?;

        tracing::debug!(
            network = %listener.network,
            address = %listener.address,
            h2c = listener.h2c,
            "listener configured"
        );

        server.add_service(svc);
    }

    Ok(server)
}

fn add_listener(svc: &mut Service<TrackedHttpApp>, listener: &ListenerConfig) -> Result<()> {
    match listener.network {
        Network::Tcp => svc.add_tcp(&listener.address),
        Network::Unix => {
            remove_stale_socket(&listener.address)?;
            svc.add_uds(&listener.address, None);
        }
    }
    Ok(())
}

/// A socket file left behind by a previous run would make the bind fail.
fn remove_stale_socket(path: &str) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path, "removed stale unix socket");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove stale unix socket {path}")),
    }
}
