mod error;
mod loader;
pub mod types;
pub mod validation;

pub use error::ConfigError;
pub use loader::{load_config, parse_config};
pub use types::OutpostConfig;
pub use validation::{ValidationIssue, ValidationReport};
