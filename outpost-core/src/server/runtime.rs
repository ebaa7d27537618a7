use crate::command::{CommandCatalog, CommandGate, CommandService};
use crate::conf::OutpostConfig;
use crate::connection::{ConnectionRegistry, MetricsAggregator};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Process-wide state shared by every listener.
#[derive(Clone)]
pub struct RuntimeState {
    pub registry: Arc<ConnectionRegistry>,
    pub commands: Arc<CommandService>,
}

/// Build the shared state and start the metrics worker on `control`.
///
/// The worker must live on a runtime that outlives every listener, since
/// connection close events keep arriving until the last socket is gone.
pub fn build_runtime_state(cfg: &OutpostConfig, control: &Handle) -> RuntimeState {
    let (metrics, worker) = MetricsAggregator::new(cfg.connections.metrics_queue_capacity);
    control.spawn(worker.run());

    let catalog = CommandCatalog::new(cfg.commands.definitions.iter().cloned());
    let gate = CommandGate::new(cfg.commands.max_concurrent);

    tracing::debug!(
        commands = catalog.len(),
        max_concurrent = cfg.commands.max_concurrent,
        "command service configured"
    );

    RuntimeState {
        registry: Arc::new(ConnectionRegistry::new(metrics)),
        commands: Arc::new(CommandService::new(catalog, gate, cfg.commands.timeouts())),
    }
}
