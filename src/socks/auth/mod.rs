//! SOCKS5 authentication module
//!
//! Handles method negotiation and dispatches to the selected
//! authentication handler.

mod none;
mod password;

pub use none::NoAuth;
pub use password::PasswordAuth;

use super::consts::*;
use crate::error::Socks5Error;
use std::collections::HashMap;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Username/password pair presented by a client or configured on a server
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub principal: String,
    /// Password
    pub secret: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            principal: principal.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authentication strategies supported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// No authentication required
    NoAuth(NoAuth),
    /// Username/password authentication
    Password(PasswordAuth),
}

/// Used when a client offers nothing the registry knows about.
static FALLBACK: Authenticator = Authenticator::NoAuth(NoAuth);

impl Authenticator {
    /// Method identifier used as registry key and on the wire
    pub fn method(&self) -> u8 {
        match self {
            Authenticator::NoAuth(auth) => auth.method(),
            Authenticator::Password(auth) => auth.method(),
        }
    }

    /// Run the method-specific sub-negotiation
    pub async fn negotiate<S>(&self, stream: &mut S) -> Result<(), Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            Authenticator::NoAuth(_) => Ok(()),
            Authenticator::Password(auth) => auth.negotiate(stream).await,
        }
    }
}

/// Maps method identifiers to the authenticators a server supports
///
/// Built once at startup and shared read-only by every connection.
#[derive(Debug, Clone)]
pub struct AuthRegistry {
    methods: HashMap<u8, Authenticator>,
}

impl Default for AuthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthRegistry {
    /// Registry supporting only the no-authentication method
    pub fn new() -> Self {
        let mut methods = HashMap::new();
        methods.insert(SOCKS5_AUTH_METHOD_NONE, Authenticator::NoAuth(NoAuth));
        AuthRegistry { methods }
    }

    /// Registry for a server with optional configured credentials
    ///
    /// No-authentication is always registered; username/password only when
    /// credentials are given.
    pub fn with_credentials(credentials: Option<Credentials>) -> Self {
        let mut registry = Self::new();
        if let Some(credentials) = credentials {
            registry.register(Authenticator::Password(PasswordAuth::new(credentials)));
        }
        registry
    }

    /// Add or replace an authenticator under its method identifier
    pub fn register(&mut self, authenticator: Authenticator) {
        self.methods.insert(authenticator.method(), authenticator);
    }

    /// Look up an authenticator by method identifier
    pub fn get(&self, method: u8) -> Option<&Authenticator> {
        self.methods.get(&method)
    }

    /// Registered method identifiers, in ascending order
    pub fn methods(&self) -> Vec<u8> {
        let mut methods: Vec<u8> = self.methods.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    /// Pick the authenticator for a client's offered methods
    ///
    /// The first offered method that is registered wins. When none is,
    /// no-authentication is selected even if the client did not offer it.
    pub fn select(&self, offered: &[u8]) -> &Authenticator {
        offered
            .iter()
            .find_map(|method| self.methods.get(method))
            .unwrap_or_else(|| self.methods.get(&SOCKS5_AUTH_METHOD_NONE).unwrap_or(&FALLBACK))
    }
}

/// Read the client greeting and announce the selected method
///
/// # Protocol
///
/// ```text
/// +----+----------+----------+        +----+--------+
/// |VER | NMETHODS | METHODS  |  --->  |VER | METHOD |
/// +----+----------+----------+        +----+--------+
/// | 1  |    1     | 0 to 255 |        | 1  |   1    |
/// +----+----------+----------+        +----+--------+
/// ```
///
/// The method's own sub-negotiation is left to the caller.
pub async fn select_method<'a, S>(
    stream: &mut S,
    registry: &'a AuthRegistry,
) -> Result<&'a Authenticator, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let version = stream.read_u8().await?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let num_methods = stream.read_u8().await?;
    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;

    let authenticator = registry.select(&methods);
    tracing::debug!(
        "Client offered methods {:?}, selected {:#04x}",
        methods,
        authenticator.method()
    );

    stream.write_all(&[SOCKS5_VERSION, authenticator.method()]).await?;
    stream.flush().await?;

    Ok(authenticator)
}
