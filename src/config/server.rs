//! Server side configuration
//!
//! Defines the settings of the SOCKS5 server.

use super::{check_port, TcpConfig};
use crate::error::ConfigError;
use crate::socks::Credentials;
use serde::{Deserialize, Serialize};

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port the server listens on, on all interfaces
    #[serde(default)]
    pub port: u16,

    /// Username required by the username/password method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password required by the username/password method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl ServerConfig {
    /// Configured credentials, if both username and password are non-empty
    pub fn credentials(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credentials::new(username, password))
            }
            _ => None,
        }
    }

    /// Check that the configuration can be used to start a server
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_port(self.port)?;

        let has_username = self.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_username != has_password {
            return Err(ConfigError::Invalid(
                "Username and password must be set together".to_string(),
            ));
        }

        Ok(())
    }
}
