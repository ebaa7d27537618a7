mod resolve;
mod serve;

pub use resolve::{ResolveError, resolve_static_path};
pub use serve::{ServeError, serve_file};

use crate::api::ApiResponse;
use crate::conf::types::StaticFilesConfig;
use http::StatusCode;
use http::header::{HeaderValue, InvalidHeaderValue};
use std::path::PathBuf;

/// Serves files below one root directory for requests no API route claims.
#[derive(Debug, Clone)]
pub struct StaticFileServer {
    root: PathBuf,
    cache_control: HeaderValue,
}

impl StaticFileServer {
    pub fn new(cfg: &StaticFilesConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            root: cfg.root_path.clone(),
            cache_control: HeaderValue::from_str(&cfg.cache_control)?,
        })
    }

    pub async fn serve(&self, request_path: &str) -> ApiResponse {
        let path = match resolve_static_path(&self.root, request_path) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(path = request_path, error = ?err, "static path rejected");
                return map_resolve_error(err);
            }
        };

        match serve_file(&path, &self.cache_control).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(file = %path.display(), error = ?err, "static file not served");
                map_serve_error(err)
            }
        }
    }
}

fn map_resolve_error(err: ResolveError) -> ApiResponse {
    match err {
        ResolveError::NotFound => ApiResponse::not_found(),
        ResolveError::Forbidden => ApiResponse::error(StatusCode::FORBIDDEN, "forbidden"),
        ResolveError::BadPath => ApiResponse::error(StatusCode::BAD_REQUEST, "bad path"),
    }
}

fn map_serve_error(err: ServeError) -> ApiResponse {
    match err {
        ServeError::NotFound => ApiResponse::not_found(),
        ServeError::Forbidden => ApiResponse::error(StatusCode::FORBIDDEN, "forbidden"),
        ServeError::Io => {
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "failed to read file")
        }
    }
}
