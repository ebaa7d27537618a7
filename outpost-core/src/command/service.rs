use crate::command::{
    CommandCatalog, CommandDefinition, CommandError, CommandGate, CommandResult, CommandRunner,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of one command invocation.
///
/// `Queued -> Acquired -> Running -> Completed`, or `Queued -> Rejected`
/// when no slot frees up in time. Nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Queued,
    Acquired,
    Running,
    Completed,
    Rejected,
}

impl fmt::Display for CommandPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Acquired => "acquired",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandTimeouts {
    /// Longest a request may queue for a gate slot.
    pub acquire: Duration,
    /// Longest a spawned process may run.
    pub execution: Duration,
}

/// Catalog lookup, gate admission and execution behind one call.
#[derive(Debug)]
pub struct CommandService {
    catalog: CommandCatalog,
    gate: CommandGate,
    runner: CommandRunner,
    timeouts: CommandTimeouts,
}

impl CommandService {
    pub fn new(catalog: CommandCatalog, gate: CommandGate, timeouts: CommandTimeouts) -> Self {
        Self {
            catalog,
            gate,
            runner: CommandRunner,
            timeouts,
        }
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn gate(&self) -> &CommandGate {
        &self.gate
    }

    pub fn timeouts(&self) -> CommandTimeouts {
        self.timeouts
    }

    /// Look up `id` and run it.
    pub async fn run_by_id(&self, id: &str) -> Result<CommandResult, CommandError> {
        let definition = self
            .catalog
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand { id: id.to_owned() })?;

        self.run(definition).await
    }

    /// Only gate admission can fail; process failures come back inside the result.
    pub async fn run(&self, definition: Arc<CommandDefinition>) -> Result<CommandResult, CommandError> {
        let queued_at = Instant::now();
        trace_phase(&definition, CommandPhase::Queued);

        let permit = match self.gate.acquire(self.timeouts.acquire).await {
            Ok(permit) => permit,
            Err(err) => {
                tracing::warn!(
                    command_id = %definition.id,
                    phase = %CommandPhase::Rejected,
                    error = %err,
                    "command rejected"
                );
                return Err(err);
            }
        };

        tracing::debug!(
            command_id = %definition.id,
            phase = %CommandPhase::Acquired,
            queued_ms = queued_at.elapsed().as_millis() as u64,
            available = self.gate.available_permits(),
        );

        trace_phase(&definition, CommandPhase::Running);
        let result = self
            .runner
            .run(&permit, definition, self.timeouts.execution)
            .await;
        drop(permit);

        tracing::info!(
            command_id = %result.command.id,
            phase = %CommandPhase::Completed,
            outcome = ?result.outcome,
            duration_ms = result.duration_ms(),
            "command completed"
        );

        Ok(result)
    }
}

fn trace_phase(definition: &CommandDefinition, phase: CommandPhase) {
    tracing::debug!(command_id = %definition.id, %phase);
}
