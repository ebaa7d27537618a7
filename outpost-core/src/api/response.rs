use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use pingora_http::ResponseHeader;
use serde::Serialize;
use std::fmt::Display;

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const ALLOWED_METHODS: &str = "GET, HEAD";

/// A fully rendered response, written to the wire by the connection loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
    /// Headers beyond content type and length, e.g. `Allow` on 405.
    pub headers: HeaderMap,
}

impl ApiResponse {
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, dto: &T) -> Self {
        match serde_json::to_vec(dto) {
            Ok(body) => Self {
                status,
                content_type: APPLICATION_JSON,
                body: body.into(),
                headers: HeaderMap::new(),
            },
            Err(err) => {
                tracing::error!(error = %err, "json serialization failed");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, "json serialization failed")
            }
        }
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    /// `{"error": "<reason>"}`
    pub fn error(status: StatusCode, reason: impl Display) -> Self {
        let body = serde_json::json!({ "error": reason.to_string() }).to_string();
        Self {
            status,
            content_type: APPLICATION_JSON,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "not found")
    }

    /// Raw file contents, typed by the caller.
    pub fn file(content_type: &'static str, body: Bytes) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method_not_allowed() -> Self {
        Self::error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
            .with_header(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))
    }

    pub fn body_not_allowed() -> Self {
        Self::error(StatusCode::BAD_REQUEST, "request body is not allowed")
    }

    pub fn response_header(&self) -> pingora::Result<ResponseHeader> {
        let mut resp = ResponseHeader::build(self.status, None)?;
        resp.insert_header(header::CONTENT_TYPE, self.content_type)?;
        resp.insert_header(header::CONTENT_LENGTH, self.body.len().to_string())?;
        for (name, value) in &self.headers {
            resp.insert_header(name, value.clone())?;
        }
        Ok(resp)
    }
}
