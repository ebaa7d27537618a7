use crate::conf::types::{
    CommandsConfig, ConnectionsConfig, ListenerConfig, OutpostConfig, ServerConfig,
    StaticFilesConfig,
};
use crate::connection::Network;
use serde::Serialize;
use std::collections::HashSet;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `commands.definitions[2].id`.
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn render_plain(&self) {
        for issue in &self.errors {
            eprintln!("error: {}: {}", issue.field, issue.message);
        }
    }

    pub fn render_json(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("failed to serialize validation report: {err}"),
        }
    }
}

/// Collect every semantic problem in `cfg` instead of failing on the first.
pub fn validate_config(cfg: &OutpostConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_server(&cfg.server, &mut report);
    validate_connections(&cfg.connections, &mut report);
    validate_commands(&cfg.commands, &mut report);
    if let Some(static_files) = &cfg.static_files {
        validate_static_files(static_files, &mut report);
    }

    report
}

fn validate_server(server: &ServerConfig, report: &mut ValidationReport) {
    let ctx = &server.api_context;
    if !ctx.starts_with('/') {
        report.error("server.api_context", format!("'{ctx}' must start with '/'"));
    } else if ctx.len() > 1 && ctx.ends_with('/') {
        report.error("server.api_context", format!("'{ctx}' must not end with '/'"));
    }

    // Pingora treats a zero keep-alive timeout as "never time out".
    if server.keepalive_seconds == 0 {
        report.error("server.keepalive_seconds", "must be at least 1");
    }

    if server.threads == Some(0) {
        report.error("server.threads", "must be at least 1");
    }

    if server.listeners.is_empty() {
        report.error("server.listeners", "at least one listener is required");
    }

    for (i, listener) in server.listeners.iter().enumerate() {
        validate_listener(i, listener, report);
    }
}

fn validate_listener(index: usize, listener: &ListenerConfig, report: &mut ValidationReport) {
    let field = format!("server.listeners[{index}].address");

    match listener.network {
        Network::Tcp => {
            if listener.address.parse::<SocketAddr>().is_err() {
                report.error(
                    field,
                    format!("'{}' is not a valid host:port socket address", listener.address),
                );
            }
        }
        Network::Unix => {
            if listener.address.trim().is_empty() {
                report.error(field, "unix socket path must not be empty");
            }
        }
    }
}

fn validate_connections(connections: &ConnectionsConfig, report: &mut ValidationReport) {
    if connections.metrics_queue_capacity == 0 {
        report.error("connections.metrics_queue_capacity", "must be at least 1");
    }
}

fn validate_commands(commands: &CommandsConfig, report: &mut ValidationReport) {
    if commands.max_concurrent == 0 {
        report.error("commands.max_concurrent", "must be at least 1");
    }
    if commands.acquire_timeout_ms == 0 {
        report.error("commands.acquire_timeout_ms", "must be greater than 0");
    }
    if commands.execution_timeout_ms == 0 {
        report.error("commands.execution_timeout_ms", "must be greater than 0");
    }

    let mut seen = HashSet::new();
    for (i, definition) in commands.definitions.iter().enumerate() {
        let field = format!("commands.definitions[{i}]");

        if definition.id.is_empty() {
            report.error(format!("{field}.id"), "must not be empty");
        } else if definition.id.contains('/') {
            report.error(
                format!("{field}.id"),
                format!("'{}' must not contain '/'", definition.id),
            );
        } else if !seen.insert(definition.id.as_str()) {
            report.error(
                format!("{field}.id"),
                format!("duplicate command id '{}'", definition.id),
            );
        }

        if definition.command.trim().is_empty() {
            report.error(format!("{field}.command"), "must not be empty");
        }
    }
}

fn validate_static_files(static_files: &StaticFilesConfig, report: &mut ValidationReport) {
    let root = &static_files.root_path;
    if !root.is_dir() {
        report.error(
            "static_files.root_path",
            format!("'{}' is not a directory", root.display()),
        );
    }

    if http::HeaderValue::from_str(&static_files.cache_control).is_err() {
        report.error(
            "static_files.cache_control",
            "must be a valid HTTP header value",
        );
    }
}
