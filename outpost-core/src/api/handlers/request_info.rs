use crate::connection::{ConnectionId, Network};
use crate::ctx::{RequestCtx, RequestId};
use http::header;
use http::request::Parts;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct RequestFields {
    pub connection_id: ConnectionId,
    pub request_id: RequestId,
    pub network: Network,
    pub close: bool,
    pub content_length: Option<u64>,
    pub host: Option<String>,
    pub method: String,
    pub protocol: String,
    pub remote_address: Option<String>,
    pub url: String,
}

/// Body of the `request_info` endpoint: the request as the server saw it.
#[derive(Debug, Serialize)]
pub struct RequestInfoDto {
    pub request_fields: RequestFields,
    /// Repeated headers are joined with "; ".
    pub request_headers: BTreeMap<String, String>,
}

impl RequestInfoDto {
    pub fn new(req: &Parts, ctx: &RequestCtx) -> Self {
        let header_str = |name: header::HeaderName| {
            req.headers
                .get(name)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        };

        let close = header_str(header::CONNECTION)
            .is_some_and(|v| v.eq_ignore_ascii_case("close"));

        let content_length =
            header_str(header::CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok());

        let host = header_str(header::HOST).or_else(|| req.uri.host().map(str::to_owned));

        let mut request_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &req.headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            request_headers
                .entry(name.as_str().to_owned())
                .and_modify(|joined| {
                    joined.push_str("; ");
                    joined.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        Self {
            request_fields: RequestFields {
                connection_id: ctx.connection_id,
                request_id: ctx.request_id.clone(),
                network: ctx.network,
                close,
                content_length,
                host,
                method: req.method.to_string(),
                protocol: format!("{:?}", req.version),
                remote_address: ctx.remote_address.clone(),
                url: req.uri.to_string(),
            },
            request_headers,
        }
    }
}
