//! Command-line plumbing shared by both binaries

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use socksbridge::config::{self, default_config_path, default_pid_path};
use std::path::{Path, PathBuf};

/// Config file path: the `--config` override or `~/.<side>.toml`
pub fn config_path(side: &str, overridden: Option<PathBuf>) -> Result<PathBuf> {
    match overridden {
        Some(path) => Ok(path),
        None => default_config_path(side).context("Cannot determine home directory"),
    }
}

/// Pid file path: `~/.<side>.pid`
pub fn pid_path(side: &str) -> Result<PathBuf> {
    default_pid_path(side).context("Cannot determine home directory")
}

/// Load a config for the `config` command, where a missing file is fine
pub fn load_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match config::load_config(path) {
        Ok(config) => Ok(config),
        Err(e) if config::is_not_found(&e) => Ok(T::default()),
        Err(e) => Err(e),
    }
}

/// Load a config for the `start` command
pub fn load_for_start<T: DeserializeOwned>(side: &str, path: &Path) -> Result<T> {
    config::load_config(path).with_context(|| {
        format!(
            "Failed to read the configuration file. If it does not exist, create it first \
             with: {} config",
            side
        )
    })
}
