//! Username/password authentication handler
//!
//! Implements RFC 1929 username/password authentication for SOCKS5.

use super::Credentials;
use crate::error::Socks5Error;
use crate::socks::consts::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Username/password authentication handler
///
/// Holds the credentials configured for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordAuth {
    expected: Credentials,
}

impl PasswordAuth {
    /// Create a handler checking against `expected`
    pub fn new(expected: Credentials) -> Self {
        PasswordAuth { expected }
    }

    /// Method identifier used on the wire
    pub fn method(&self) -> u8 {
        SOCKS5_AUTH_METHOD_PASSWORD
    }

    /// Succeeds iff the raw username and password bytes match exactly
    ///
    /// The wire fields are compared as sent; they are never decoded first.
    pub fn authenticate(&self, username: &[u8], password: &[u8]) -> Result<(), Socks5Error> {
        if username == self.expected.principal.as_bytes()
            && password == self.expected.secret.as_bytes()
        {
            Ok(())
        } else {
            Err(Socks5Error::AuthFailed)
        }
    }

    /// Run the username/password sub-negotiation
    ///
    /// # Protocol
    ///
    /// Client sends:
    /// ```text
    /// +----+------+----------+------+----------+
    /// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    /// +----+------+----------+------+----------+
    /// | 1  |  1   | 0 to 255 |  1   | 0 to 255 |
    /// +----+------+----------+------+----------+
    /// ```
    ///
    /// Server responds:
    /// ```text
    /// +----+--------+
    /// |VER | STATUS |
    /// +----+--------+
    /// | 1  |   1    |
    /// +----+--------+
    /// ```
    ///
    /// A rejected client still receives the failure status before the error
    /// is returned.
    pub async fn negotiate<S>(&self, stream: &mut S) -> Result<(), Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (username, password) = read_credentials(stream).await?;
        let user = String::from_utf8_lossy(&username);

        match self.authenticate(&username, &password) {
            Ok(()) => {
                send_auth_result(stream, SOCKS5_AUTH_SUCCESS).await?;
                tracing::debug!("Authentication successful for user: {}", user);
                Ok(())
            }
            Err(e) => {
                send_auth_result(stream, SOCKS5_AUTH_FAILURE).await?;
                tracing::debug!("Authentication failed for user: {}", user);
                Err(e)
            }
        }
    }
}

/// Read the client's username/password request as raw bytes
async fn read_credentials<S>(stream: &mut S) -> Result<(Vec<u8>, Vec<u8>), Socks5Error>
where
    S: AsyncRead + Unpin,
{
    // Read version and username length
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;

    if header[0] != SOCKS5_AUTH_VERSION {
        return Err(Socks5Error::UnsupportedAuthVersion(header[0]));
    }

    let mut username = vec![0u8; header[1] as usize];
    stream.read_exact(&mut username).await?;

    let mut password_len = [0u8; 1];
    stream.read_exact(&mut password_len).await?;

    let mut password = vec![0u8; password_len[0] as usize];
    stream.read_exact(&mut password).await?;

    Ok((username, password))
}

/// Send authentication result to client
async fn send_auth_result<S: AsyncWrite + Unpin>(
    stream: &mut S,
    status: u8,
) -> Result<(), Socks5Error> {
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await?;
    Ok(())
}
