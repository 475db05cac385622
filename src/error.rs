//! Error types for Socksbridge
//!
//! This module defines the error taxonomy shared by the SOCKS5 engine, the
//! relay and the configuration layer.

use crate::socks::SocksCommand;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// SOCKS5 specific errors
///
/// Every error raised while serving one connection stays inside that
/// connection's task; the listener only ever logs them.
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version in the greeting or the request header
    #[error("Unsupported SOCKS version: expected 5, got {0}")]
    UnsupportedVersion(u8),

    /// Unsupported username/password sub-negotiation version
    #[error("Unsupported auth version: expected 1, got {0}")]
    UnsupportedAuthVersion(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Authentication failed
    #[error("Authentication failed")]
    AuthFailed,

    /// Command other than CONNECT
    #[error("Command not supported: {0}")]
    CommandNotSupported(SocksCommand),

    /// Destination could not be resolved
    #[error("Failed to resolve {host}: {reason}")]
    Resolve {
        /// Host name that failed to resolve
        host: String,
        /// Resolver failure description
        reason: String,
    },

    /// Dialing the destination failed
    #[error("Failed to connect to {target}: {source}")]
    Dial {
        /// Reply code sent to the client for this failure
        code: Socks5ReplyCode,
        /// Rendered destination
        target: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Address cannot be encoded in a reply
    #[error("Failed to format address: {0}")]
    AddressFormat(String),

    /// IO error while framing or relaying
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Socks5Error {
    /// Whether the error is a framing-level protocol violation
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Socks5Error::UnsupportedVersion(_) | Socks5Error::UnsupportedAuthVersion(_)
        )
    }

    /// Whether the error was caused by what the client sent
    ///
    /// These are routine for an open proxy and are logged quietly.
    pub fn is_client_error(&self) -> bool {
        self.is_protocol_error()
            || matches!(
                self,
                Socks5Error::AddressTypeNotSupported(_)
                    | Socks5Error::AuthFailed
                    | Socks5Error::CommandNotSupported(_)
            )
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Config file not exist: {0}")]
    NotFound(PathBuf),

    /// The configuration values are not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    /// Classify a failed dial.
    ///
    /// Refusals and unreachable networks get their own codes, anything else
    /// is reported as an unreachable host.
    fn from(err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::ConnectionRefused {
            return Socks5ReplyCode::ConnectionRefused;
        }

        let msg = err.to_string().to_lowercase();
        if msg.contains("refused") {
            Socks5ReplyCode::ConnectionRefused
        } else if msg.contains("network is unreachable") || msg.contains("network unreachable") {
            Socks5ReplyCode::NetworkUnreachable
        } else {
            Socks5ReplyCode::HostUnreachable
        }
    }
}
