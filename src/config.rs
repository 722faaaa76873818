//! Configuration loading and schema definitions for split-test.
//!
//! Configuration is optional. It lets a repository pin its test layout and
//! report locations in `split-test.toml` instead of repeating them in every
//! CI job.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "split-test.toml";

/// Loads split-test configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (e.g., doesn't exist or permission denied)
/// - The file contains invalid TOML syntax
/// - The configuration doesn't match the expected schema
///
/// # Example
///
/// ```no_run
/// use split_test::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("split-test.toml"))?;
/// println!("Nodes: {}", config.split.node_total);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads split-test configuration from a TOML string.
///
/// # Example
///
/// ```
/// use split_test::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [split]
///     node_total = 4
///
///     [discovery]
///     test_dir = "test"
///     test_pattern = "**/*_test.rb"
/// "#)?;
///
/// assert_eq!(config.split.node_total, 4);
/// assert_eq!(config.split.default_weight, 1.0);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}

/// Loads `path` if given, else the default file when it exists, else defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}
