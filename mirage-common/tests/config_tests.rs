//! Config resolution tests
//!
//! Uses serial_test to prevent races on the MIRAGE_CONFIG environment
//! variable: tests that manipulate it are marked with #[serial].

use mirage_common::config::{load_config, resolve_config_path, CONFIG_ENV_VAR};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct LevelOnly {
    level: String,
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env.toml");
    std::fs::write(&path, "level = \"trace\"\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let resolved = resolve_config_path(None);
    let loaded: Option<LevelOnly> = load_config(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(path));
    assert_eq!(loaded.unwrap().level, "trace");
}

#[test]
#[serial]
fn test_cli_argument_overrides_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let cli = PathBuf::from("/tmp/from-cli.toml");

    let resolved = resolve_config_path(Some(&cli));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(cli));
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    // Either nothing, or an existing per-user file
    if let Some(path) = resolved {
        assert!(path.exists());
    }
}
