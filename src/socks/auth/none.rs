//! No authentication handler
//!
//! Handles the case when no authentication is required.

use crate::socks::consts::SOCKS5_AUTH_METHOD_NONE;

/// No authentication handler
///
/// Selecting this method ends the negotiation; no further bytes are
/// exchanged with the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoAuth;

impl NoAuth {
    /// Method identifier used on the wire
    pub fn method(&self) -> u8 {
        SOCKS5_AUTH_METHOD_NONE
    }
}
