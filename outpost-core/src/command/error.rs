use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Control-flow failures of the command path.
///
/// Process-level failures are never represented here; they are folded into
/// the command output instead.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("timed out after {}ms waiting for a command slot", waited.as_millis())]
    AcquireTimeout { waited: Duration },

    #[error("command gate is closed")]
    GateClosed,

    #[error("unknown command '{id}'")]
    UnknownCommand { id: String },
}

impl CommandError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AcquireTimeout { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::GateClosed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownCommand { .. } => StatusCode::NOT_FOUND,
        }
    }
}
