use crate::api::ApiResponse;
use crate::command::{CommandDefinition, CommandResult, CommandService};
use chrono::SecondsFormat;
use http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RunCommandResponse<'a> {
    command_info: &'a CommandDefinition,
    now: String,
    command_duration_ms: u64,
    command_output: &'a str,
}

impl<'a> From<&'a CommandResult> for RunCommandResponse<'a> {
    fn from(result: &'a CommandResult) -> Self {
        Self {
            command_info: &result.command,
            now: result
                .completed_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            command_duration_ms: result.duration_ms(),
            command_output: &result.output,
        }
    }
}

pub(super) fn list(commands: &CommandService) -> ApiResponse {
    ApiResponse::json(StatusCode::OK, commands.catalog().all())
}

pub(super) async fn run(commands: &CommandService, id: &str) -> ApiResponse {
    match commands.run_by_id(id).await {
        Ok(result) => ApiResponse::json(StatusCode::OK, &RunCommandResponse::from(&result)),
        Err(err) => ApiResponse::error(err.status(), &err),
    }
}
