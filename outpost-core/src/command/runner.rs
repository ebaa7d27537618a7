use crate::command::{CommandDefinition, CommandPermit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdout, Command};

/// Prefix of every diagnostic that replaces command output.
pub const COMMAND_ERROR_PREFIX: &str = "command error";

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Result of one command invocation. Failures are data, not errors.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command: Arc<CommandDefinition>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
    pub outcome: CommandOutcome,
    pub output: String,
}

impl CommandResult {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

#[derive(Debug, thiserror::Error)]
enum ExecutionFailure {
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Exit(ExitStatus),

    #[error("failed to collect output: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl ExecutionFailure {
    fn outcome(&self) -> CommandOutcome {
        match self {
            Self::TimedOut(_) => CommandOutcome::TimedOut,
            _ => CommandOutcome::Failed,
        }
    }
}

/// Spawns one external process per invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

impl CommandRunner {
    /// Run `definition` to completion or until `deadline` elapses.
    ///
    /// The permit is only required as proof that a gate slot is held.
    /// Dropping the returned future kills the child process.
    pub async fn run(
        &self,
        _permit: &CommandPermit,
        definition: Arc<CommandDefinition>,
        deadline: Duration,
    ) -> CommandResult {
        let started = Instant::now();
        let executed = execute(&definition, deadline).await;
        let duration = started.elapsed();

        let (outcome, output) = match executed {
            Ok(output) => (CommandOutcome::Succeeded, output),
            Err(failure) => {
                tracing::debug!(
                    command_id = %definition.id,
                    error = %failure,
                    "command failed"
                );
                (failure.outcome(), format!("{COMMAND_ERROR_PREFIX}: {failure}"))
            }
        };

        CommandResult {
            command: definition,
            completed_at: Utc::now(),
            duration,
            outcome,
            output,
        }
    }
}

async fn execute(definition: &CommandDefinition, deadline: Duration) -> Result<String, ExecutionFailure> {
    let mut child = Command::new(&definition.command)
        .args(&definition.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecutionFailure::Spawn {
            command: definition.command.clone(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = tokio::time::timeout(deadline, async {
        let output = read_combined(stdout, stderr).await?;
        let status = child.wait().await?;
        Ok::<_, io::Error>((status, output))
    })
    .await;

    match finished {
        Ok(Ok((status, output))) if status.success() => {
            Ok(String::from_utf8_lossy(&output).into_owned())
        }
        Ok(Ok((status, _))) => Err(ExecutionFailure::Exit(status)),
        Ok(Err(err)) => Err(ExecutionFailure::Io(err)),
        Err(_elapsed) => {
            if let Err(err) = child.kill().await {
                tracing::warn!(command_id = %definition.id, error = %err, "failed to kill timed out command");
            }
            Err(ExecutionFailure::TimedOut(deadline))
        }
    }
}

enum PipeRead {
    Stdout(usize),
    Stderr(usize),
}

/// Drain stdout and stderr into one buffer in arrival order.
async fn read_combined(
    mut stdout: Option<ChildStdout>,
    mut stderr: Option<ChildStderr>,
) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut out_buf = [0u8; READ_CHUNK];
    let mut err_buf = [0u8; READ_CHUNK];

    while stdout.is_some() || stderr.is_some() {
        let read = tokio::select! {
            n = read_some(&mut stdout, &mut out_buf) => PipeRead::Stdout(n?),
            n = read_some(&mut stderr, &mut err_buf) => PipeRead::Stderr(n?),
        };

        match read {
            PipeRead::Stdout(0) => stdout = None,
            PipeRead::Stderr(0) => stderr = None,
            PipeRead::Stdout(n) => output.extend_from_slice(&out_buf[..n]),
            PipeRead::Stderr(n) => output.extend_from_slice(&err_buf[..n]),
        }
    }

    Ok(output)
}

async fn read_some<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
