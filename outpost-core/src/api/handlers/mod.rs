mod commands;
mod connection_info;
mod request_info;
mod version_info;

pub use connection_info::{ConnectionCountsDto, ConnectionDto, ConnectionInfoDto, format_duration};
pub use request_info::{RequestFields, RequestInfoDto};
pub use version_info::VersionInfoDto;

use crate::api::{ApiEndpoint, ApiResponse};
use crate::command::CommandService;
use crate::connection::ConnectionRegistry;
use crate::ctx::RequestCtx;
use crate::static_files::StaticFileServer;
use http::request::Parts;
use http::{Method, StatusCode};
use std::sync::Arc;

const HEALTH_BODY: &str = "all good";

/// Terminal handler for every request on every listener.
pub struct ApiHandler {
    api_context: String,
    registry: Arc<ConnectionRegistry>,
    commands: Arc<CommandService>,
    static_files: Option<StaticFileServer>,
}

impl ApiHandler {
    pub fn new(
        api_context: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        commands: Arc<CommandService>,
    ) -> Self {
        Self {
            api_context: api_context.into(),
            registry,
            commands,
            static_files: None,
        }
    }

    /// Serve files for GET/HEAD requests that match no API route.
    pub fn with_static_files(mut self, static_files: StaticFileServer) -> Self {
        self.static_files = Some(static_files);
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn commands(&self) -> &Arc<CommandService> {
        &self.commands
    }

    /// HEAD is answered like GET; the connection loop drops the body.
    pub async fn handle(&self, req: &Parts, ctx: &RequestCtx) -> ApiResponse {
        let readable = req.method == Method::GET || req.method == Method::HEAD;

        let Some(endpoint) = ApiEndpoint::resolve(&self.api_context, req.uri.path()) else {
            return match &self.static_files {
                Some(static_files) if readable => static_files.serve(req.uri.path()).await,
                Some(_) => ApiResponse::method_not_allowed(),
                None => ApiResponse::not_found(),
            };
        };

        if !readable {
            return ApiResponse::method_not_allowed();
        }

        match endpoint {
            ApiEndpoint::Health => ApiResponse::text(StatusCode::OK, HEALTH_BODY),
            ApiEndpoint::Commands => commands::list(&self.commands),
            ApiEndpoint::RunCommand(id) => commands::run(&self.commands, &id).await,
            ApiEndpoint::ConnectionInfo => {
                let snapshot = self.registry.state_snapshot();
                ApiResponse::json(StatusCode::OK, &ConnectionInfoDto::from_snapshot(&snapshot))
            }
            ApiEndpoint::RequestInfo => {
                ApiResponse::json(StatusCode::OK, &RequestInfoDto::new(req, ctx))
            }
            ApiEndpoint::VersionInfo => ApiResponse::json(StatusCode::OK, &VersionInfoDto::CURRENT),
        }
    }
}
