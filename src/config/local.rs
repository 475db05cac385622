//! Local side configuration
//!
//! Defines the settings of the local forwarder.

use super::{check_port, TcpConfig};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Local forwarder configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LocalConfig {
    /// Remote endpoint every accepted connection is forwarded to (`host:port`)
    #[serde(default)]
    pub remote_address: String,

    /// Port the forwarder listens on, on all interfaces
    #[serde(default)]
    pub port: u16,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl LocalConfig {
    /// Check that the configuration can be used to start a forwarder
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_address.is_empty() {
            return Err(ConfigError::Invalid(
                "Remote address should not be empty".to_string(),
            ));
        }

        check_port(self.port)
    }
}
