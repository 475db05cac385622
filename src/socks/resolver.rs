//! Name resolution for FQDN destinations

use crate::error::Socks5Error;
use std::net::IpAddr;
use tokio::net::lookup_host;

/// Resolves host names through the system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    /// Resolve `host` to its first address
    pub async fn resolve(&self, host: &str) -> Result<IpAddr, Socks5Error> {
        let mut addrs = lookup_host((host, 0))
            .await
            .map_err(|e| Socks5Error::Resolve {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| Socks5Error::Resolve {
                host: host.to_string(),
                reason: "no addresses returned".to_string(),
            })
    }
}
