use crate::conf::{ConfigError, OutpostConfig, load_config};
use crate::connection::Network;
use std::path::Path;

pub fn check(path: &Path, json: bool) -> anyhow::Result<()> {
    match load_config(path) {
        Ok(cfg) => {
            print_summary(&cfg);
            Ok(())
        }
        Err(err) => {
            print_config_error(&err, json);
            std::process::exit(1);
        }
    }
}

fn print_summary(cfg: &OutpostConfig) {
    let listeners = &cfg.server.listeners;
    let count = |network: Network| listeners.iter().filter(|l| l.network == network).count();

    println!("✔ Config loaded successfully");
    println!("✔ API context {}", cfg.server.api_context);
    println!(
        "✔ {} listeners ({} tcp, {} unix)",
        listeners.len(),
        count(Network::Tcp),
        count(Network::Unix)
    );
    println!(
        "✔ {} commands, at most {} running at once",
        cfg.commands.definitions.len(),
        cfg.commands.max_concurrent
    );
}

fn print_config_error(err: &ConfigError, json: bool) {
    match err {
        ConfigError::Invalid { report, .. } if json => report.render_json(),
        ConfigError::Invalid { report, .. } => {
            eprintln!("{err}");
            report.render_plain();
        }
        _ => eprintln!("{err}"),
    }
}
