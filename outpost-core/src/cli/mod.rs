mod check;

pub use check::*;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Validate configuration and exit
    Check {
        /// Path to the config file
        #[arg(long, default_value = "config/outpost.toml")]
        config: PathBuf,

        /// Print validation errors as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}
