use clap::{Parser, Subcommand};
use outpost_core::cli::{ConfigCmd, check};
use outpost_core::conf::load_config;
use outpost_core::logging::init_logging;
use outpost_core::server;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/outpost.toml";

#[derive(Parser, Debug)]
#[command(
    name = "outpost",
    version,
    about = "Outpost: connection-tracking HTTP API server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration tooling
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Run the Outpost server (default)
    Run {
        /// Path to the Outpost config file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config {
            cmd: ConfigCmd::Check { config, json },
        }) => check(&config, json),

        Some(Command::Run { config }) => run(&config),

        None => run(Path::new(DEFAULT_CONFIG_PATH)),
    }
}

fn run(config: &Path) -> anyhow::Result<()> {
    let cfg = load_config(config)?;

    // Keep the guard alive so buffered access log lines are flushed on exit.
    let _log_guard = init_logging(&cfg.logging);
    tracing::info!(config = %config.display(), "configuration loaded");

    server::run(cfg)
}
