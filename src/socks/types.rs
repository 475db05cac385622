//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not implemented)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not implemented)
    UdpAssociate,
    /// Any other command byte a client may send
    Unknown(u8),
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => SocksCommand::Connect,
            SOCKS5_CMD_TCP_BIND => SocksCommand::Bind,
            SOCKS5_CMD_UDP_ASSOCIATE => SocksCommand::UdpAssociate,
            other => SocksCommand::Unknown(other),
        }
    }

}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
            SocksCommand::Unknown(byte) => write!(f, "UNKNOWN({:#04x})", byte),
        }
    }
}

/// Network endpoint carried in SOCKS5 requests and replies
///
/// Either a raw IP plus port or a domain name plus port. A domain is
/// resolved to an IP before the destination is dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrSpec {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl AddrSpec {
    /// Create a new AddrSpec from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        AddrSpec::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new AddrSpec from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        AddrSpec::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new AddrSpec from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        AddrSpec::Domain(domain.into(), port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            AddrSpec::Ip(addr) => addr.port(),
            AddrSpec::Domain(_, port) => *port,
        }
    }

    /// Get the IP address, if this is not a domain
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            AddrSpec::Ip(addr) => Some(addr.ip()),
            AddrSpec::Domain(_, _) => None,
        }
    }

    /// Get the domain name, if this is one
    pub fn fqdn(&self) -> Option<&str> {
        match self {
            AddrSpec::Ip(_) => None,
            AddrSpec::Domain(domain, _) => Some(domain),
        }
    }

    /// Replace a domain with a resolved IP, keeping the port
    pub fn with_ip(&self, ip: IpAddr) -> Self {
        AddrSpec::Ip(SocketAddr::new(ip, self.port()))
    }
}

impl fmt::Display for AddrSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrSpec::Ip(addr) => write!(f, "{}", addr),
            AddrSpec::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for AddrSpec {
    fn from(addr: SocketAddr) -> Self {
        AddrSpec::Ip(addr)
    }
}
