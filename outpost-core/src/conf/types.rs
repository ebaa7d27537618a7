use crate::command::{CommandDefinition, CommandTimeouts};
use crate::connection::Network;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutpostConfig {
    pub server: ServerConfig,

    #[serde(default)]
    pub connections: ConnectionsConfig,

    pub commands: CommandsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Files served for GET/HEAD requests that match no API route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_files: Option<StaticFilesConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Path prefix for every API route, e.g. "/api/v1".
    #[serde(default = "default_api_context")]
    pub api_context: String,

    /// Optional number of worker threads - default is decided by Pingora.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Idle timeout for HTTP/1.1 keep-alive connections.
    #[serde(default = "default_keepalive_seconds")]
    pub keepalive_seconds: u64,

    pub listeners: Vec<ListenerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    pub network: Network,

    /// "host:port" for tcp, a filesystem path for unix.
    pub address: String,

    /// Accept cleartext HTTP/2 (prior knowledge) next to HTTP/1.x.
    #[serde(default)]
    pub h2c: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionsConfig {
    #[serde(default = "default_metrics_queue_capacity")]
    pub metrics_queue_capacity: usize,
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self {
            metrics_queue_capacity: default_metrics_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandsConfig {
    pub max_concurrent: usize,
    pub acquire_timeout_ms: u64,
    pub execution_timeout_ms: u64,

    #[serde(default)]
    pub definitions: Vec<CommandDefinition>,
}

impl CommandsConfig {
    pub fn timeouts(&self) -> CommandTimeouts {
        CommandTimeouts {
            acquire: Duration::from_millis(self.acquire_timeout_ms),
            execution: Duration::from_millis(self.execution_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for the daily-rolling request log. Request events go to the
    /// application log when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    pub root_path: PathBuf,

    #[serde(default = "default_cache_control")]
    pub cache_control: String,
}

fn default_api_context() -> String {
    "/api/v1".to_string()
}

fn default_keepalive_seconds() -> u64 {
    60
}

fn default_metrics_queue_capacity() -> usize {
    8192
}

fn default_cache_control() -> String {
    "public, no-cache".to_string()
}
