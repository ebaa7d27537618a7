use crate::api::ApiHandler;
use crate::command::{
    CommandCatalog, CommandDefinition, CommandGate, CommandService, CommandTimeouts,
};
use crate::connection::{ConnectionGuard, ConnectionRegistry, MetricsAggregator, Network};
use crate::conf::types::StaticFilesConfig;
use crate::ctx::RequestCtx;
use crate::static_files::StaticFileServer;
use http::request::Parts;
use http::{Method, Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------
// Helpers
// ---------------------------

fn handler(max_concurrent: usize) -> ApiHandler {
    let (aggregator, worker) = MetricsAggregator::new(64);
    tokio::spawn(worker.run());

    let catalog = CommandCatalog::new(vec![
        CommandDefinition {
            id: "hello".to_string(),
            description: "say hello".to_string(),
            command: "echo".to_string(),
            args: vec!["hello".to_string()],
        },
        CommandDefinition {
            id: "slow".to_string(),
            description: String::new(),
            command: "sleep".to_string(),
            args: vec!["5".to_string()],
        },
    ]);
    let commands = CommandService::new(
        catalog,
        CommandGate::new(max_concurrent),
        CommandTimeouts {
            acquire: Duration::from_millis(20),
            execution: Duration::from_secs(2),
        },
    );

    ApiHandler::new(
        "/api/v1",
        Arc::new(ConnectionRegistry::new(aggregator)),
        Arc::new(commands),
    )
}

fn get(uri: &str) -> Parts {
    request(Method::GET, uri)
}

fn request(method: Method, uri: &str) -> Parts {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost:8080")
        .header(header::ACCEPT, "text/plain")
        .header(header::ACCEPT, "application/json")
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn ctx(guard: &ConnectionGuard) -> RequestCtx {
    RequestCtx::new(guard.id(), Network::Tcp, Some("127.0.0.1:50000".to_string()))
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

// ---------------------------
// Tests
// ---------------------------

#[tokio::test]
async fn health_is_plain_text() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler.handle(&get("/api/v1/health"), &ctx(&guard)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(&resp.body[..], b"all good");
    assert!(resp.content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler.handle(&get("/api/v1/nope"), &ctx(&guard)).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&resp.body)["error"], "not found");
}

#[tokio::test]
async fn non_get_is_405_with_allow() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler
        .handle(&request(Method::POST, "/api/v1/health"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers[header::ALLOW], "GET, HEAD");

    let resp_header = resp.response_header().unwrap();
    assert_eq!(resp_header.headers.get(header::ALLOW).unwrap(), "GET, HEAD");
}

#[tokio::test]
async fn head_is_answered_like_get() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler
        .handle(&request(Method::HEAD, "/api/v1/health"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(&resp.body[..], b"all good");
}

#[tokio::test]
async fn unmatched_reads_fall_through_to_static_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>outpost</h1>").unwrap();
    std::fs::write(dir.path().join(".htpasswd"), "admin:x").unwrap();
    let handler = handler(1).with_static_files(
        StaticFileServer::new(&StaticFilesConfig {
            root_path: dir.path().to_path_buf(),
            cache_control: "public, no-cache".to_string(),
        })
        .unwrap(),
    );
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler.handle(&get("/"), &ctx(&guard)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.content_type, "text/html");
    assert_eq!(&resp.body[..], b"<h1>outpost</h1>");

    let resp = handler.handle(&get("/.htpasswd"), &ctx(&guard)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    // API routes still win over files.
    let resp = handler.handle(&get("/api/v1/health"), &ctx(&guard)).await;
    assert_eq!(&resp.body[..], b"all good");

    let resp = handler
        .handle(&request(Method::DELETE, "/index.html"), &ctx(&guard))
        .await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn lists_commands_in_config_order() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler.handle(&get("/api/v1/commands"), &ctx(&guard)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let json = body_json(&resp.body);
    assert_eq!(json[0]["id"], "hello");
    assert_eq!(json[0]["args"], serde_json::json!(["hello"]));
    assert_eq!(json[1]["id"], "slow");
}

#[tokio::test]
async fn runs_command() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler
        .handle(&get("/api/v1/commands/hello"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let json = body_json(&resp.body);
    assert_eq!(json["command_info"]["id"], "hello");
    assert_eq!(json["command_output"], "hello\n");
    assert!(json["command_duration_ms"].is_u64());
    assert!(json["now"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn unknown_command_is_404() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler
        .handle(&get("/api/v1/commands/missing"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&resp.body)["error"], "unknown command 'missing'");
}

#[tokio::test]
async fn busy_gate_is_429() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);
    let _held = handler
        .commands()
        .gate()
        .acquire(Duration::from_millis(10))
        .await
        .unwrap();

    let resp = handler
        .handle(&get("/api/v1/commands/hello"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn closed_gate_is_500() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);
    handler.commands().gate().close();

    let resp = handler
        .handle(&get("/api/v1/commands/hello"), &ctx(&guard))
        .await;

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn request_info_echoes_request() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);
    let ctx = ctx(&guard);

    let resp = handler
        .handle(&get("/api/v1/request_info?x=1"), &ctx)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let json = body_json(&resp.body);
    let fields = &json["request_fields"];
    assert_eq!(fields["connection_id"], guard.id().0);
    assert_eq!(fields["request_id"], ctx.request_id.0.as_str());
    assert_eq!(fields["method"], "GET");
    assert_eq!(fields["protocol"], "HTTP/1.1");
    assert_eq!(fields["host"], "localhost:8080");
    assert_eq!(fields["url"], "/api/v1/request_info?x=1");
    assert_eq!(fields["remote_address"], "127.0.0.1:50000");
    assert_eq!(fields["close"], false);
    assert_eq!(
        json["request_headers"]["accept"],
        "text/plain; application/json"
    );
}

#[tokio::test]
async fn connection_info_lists_the_calling_connection() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);
    guard.on_request();

    let resp = handler
        .handle(&get("/api/v1/connection_info"), &ctx(&guard))
        .await;

    let json = body_json(&resp.body);
    assert_eq!(json["current_connections"][0]["id"], guard.id().0);
    assert_eq!(json["current_connections"][0]["requests"], 1);
    assert_eq!(json["current_connection_counts"]["total"], 1);
}

#[tokio::test]
async fn version_info_reports_crate_version() {
    let handler = handler(1);
    let guard = ConnectionGuard::register(handler.registry().clone(), Network::Tcp);

    let resp = handler
        .handle(&get("/api/v1/version_info"), &ctx(&guard))
        .await;

    let json = body_json(&resp.body);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["rustc"].is_string());
}
