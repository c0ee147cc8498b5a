//! Configuration file resolution and loading
//!
//! Config file lookup follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`<config_dir>/mirage/config.toml`)
//!
//! A missing or malformed file never aborts startup: callers receive
//! `None` and fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MIRAGE_CONFIG";

/// Resolve which config file to use, if any.
///
/// The CLI argument and the environment variable are returned as given,
/// even if the file does not exist, so that a typo surfaces as a warning
/// when loading. The per-user default is only returned if it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    default_config_path().filter(|path| path.exists())
}

/// Platform config location, e.g. `~/.config/mirage/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mirage").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Resolve and load a config file, degrading to `None` on any problem.
pub fn load_config<T: DeserializeOwned>(cli_arg: Option<&Path>) -> Option<T> {
    let path = resolve_config_path(cli_arg)?;

    match load_toml(&path) {
        Ok(config) => {
            debug!("Loaded configuration from {}", path.display());
            Some(config)
        }
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        level: String,
    }

    #[test]
    fn test_cli_argument_wins() {
        let path = PathBuf::from("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(&path)), Some(path));
    }

    #[test]
    fn test_load_toml_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "level = \"debug\"\n").unwrap();

        let sample: Sample = load_toml(&path).unwrap();
        assert_eq!(sample.level, "debug");
    }

    #[test]
    fn test_load_toml_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "level = [unterminated").unwrap();

        let result: Result<Sample> = load_toml(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_degrades_to_none() {
        let missing = PathBuf::from("/nonexistent/mirage/config.toml");
        let config: Option<Sample> = load_config(Some(&missing));
        assert!(config.is_none());
    }
}
