use crate::conf::types::OutpostConfig;
use crate::conf::validation::validate_config;
use crate::conf::ConfigError;
use std::fs;
use std::path::Path;

/// Read, parse and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<OutpostConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    parse_config(path, &raw)
}

/// Parse and validate config text. `path` is only used for error reporting.
pub fn parse_config(path: &Path, raw: &str) -> Result<OutpostConfig, ConfigError> {
    let cfg: OutpostConfig = toml::from_str(raw).map_err(|e| ConfigError::parse(path, e))?;

    let report = validate_config(&cfg);
    if !report.is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            report,
        });
    }

    Ok(cfg)
}
