//! Configuration module for Socksbridge
//!
//! This module provides configuration types for both sides together with
//! loading, saving and default file locations.

mod local;
mod server;
mod transport;

pub use local::LocalConfig;
pub use server::ServerConfig;
pub use transport::TcpConfig;

use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the server side, used for file names
pub const SERVER_SIDE_NAME: &str = "socks5-server";

/// Name of the local side, used for file names
pub const LOCAL_SIDE_NAME: &str = "socks5-local";

/// Lowest port either side may listen on
pub const MIN_PORT: u16 = 1024;

/// Load configuration from a TOML file
///
/// A missing file is reported as [`ConfigError::NotFound`] so callers can
/// tell it apart from a malformed one.
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Incorrect config format: {:?}", path))
}

/// Parse configuration from a TOML string
pub fn parse_config<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}

/// Render configuration as pretty TOML
pub fn render_config<T: Serialize>(config: &T) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration")
}

/// Write configuration to a TOML file, replacing any previous content
pub fn save_config<T, P>(path: P, config: &T) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = render_config(config)?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))
}

/// Whether an error came from a missing config file
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::NotFound(_)))
}

/// Default config path for a side: `~/.<side>.toml`
pub fn default_config_path(side: &str) -> Option<PathBuf> {
    home_file(&format!(".{}.toml", side))
}

/// Default pid file path for a side: `~/.<side>.pid`
pub fn default_pid_path(side: &str) -> Option<PathBuf> {
    home_file(&format!(".{}.pid", side))
}

fn home_file(name: &str) -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(name))
}

pub(crate) fn check_port(port: u16) -> Result<(), ConfigError> {
    if port < MIN_PORT {
        return Err(ConfigError::Invalid(format!(
            "Port must be greater than {}, got {}",
            MIN_PORT, port
        )));
    }
    Ok(())
}
