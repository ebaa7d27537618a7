use crate::api::ApiResponse;
use bytes::Bytes;
use http::header::{self, HeaderValue};
use httpdate::fmt_http_date;
use std::io;
use std::path::Path;
use tokio::fs;

const MAX_STATIC_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MiB
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeError {
    NotFound,
    Forbidden,
    Io,
}

impl From<io::Error> for ServeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Io,
        }
    }
}

/// Read a resolved file into a response with type, cache and modification headers.
pub async fn serve_file(
    path: &Path,
    cache_control: &HeaderValue,
) -> Result<ApiResponse, ServeError> {
    let metadata = fs::metadata(path).await?;

    if !metadata.is_file() {
        return Err(ServeError::NotFound);
    }

    // Files are buffered whole.
    if metadata.len() > MAX_STATIC_FILE_SIZE {
        return Err(ServeError::Forbidden);
    }

    let body = fs::read(path).await?;
    let content_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(OCTET_STREAM);

    let mut response = ApiResponse::file(content_type, Bytes::from(body))
        .with_header(header::CACHE_CONTROL, cache_control.clone());

    if let Ok(modified) = metadata.modified() {
        let value = HeaderValue::from_str(&fmt_http_date(modified));
        if let Ok(value) = value {
            response = response.with_header(header::LAST_MODIFIED, value);
        }
    }

    Ok(response)
}
