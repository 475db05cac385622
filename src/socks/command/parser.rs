//! SOCKS5 request parser
//!
//! Parses SOCKS5 requests from the client.

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::{AddrSpec, SocksCommand};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// A parsed SOCKS5 request
///
/// The client stream itself stays with the caller, positioned right after
/// the port bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Protocol version, always 5 once parsed
    pub version: u8,
    /// Requested command
    pub command: SocksCommand,
    /// Where the client wants to go
    pub destination: AddrSpec,
    /// Observed peer address of the client, when known
    pub remote_addr: Option<AddrSpec>,
}

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Reads exactly the framed fields and nothing beyond the port. An unknown
/// ATYP yields [`Socks5Error::AddressTypeNotSupported`] so the caller can
/// still answer the client.
pub async fn parse_request<S>(
    stream: &mut S,
    peer: Option<SocketAddr>,
) -> Result<Request, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV
    let mut header = [0u8; 3];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let command = SocksCommand::from_byte(header[1]);
    let destination = read_addr_spec(stream).await?;

    tracing::debug!("Parsed SOCKS5 request: {} to {}", command, destination);

    Ok(Request {
        version,
        command,
        destination,
        remote_addr: peer.map(AddrSpec::from),
    })
}

/// Read ATYP, the address and the big-endian port
async fn read_addr_spec<S>(stream: &mut S) -> Result<AddrSpec, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let addr_type = stream.read_u8().await?;

    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(AddrSpec::ipv4(Ipv4Addr::from(addr), port))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let domain_len = stream.read_u8().await? as usize;

            let mut domain_buf = vec![0u8; domain_len];
            stream.read_exact(&mut domain_buf).await?;
            let domain = String::from_utf8_lossy(&domain_buf).into_owned();

            let port = stream.read_u16().await?;

            Ok(AddrSpec::domain(domain, port))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(AddrSpec::ipv6(Ipv6Addr::from(addr), port))
        }

        other => Err(Socks5Error::AddressTypeNotSupported(other)),
    }
}
