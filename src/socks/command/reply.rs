//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::socks::consts::*;
use crate::socks::types::AddrSpec;
use bytes::{BufMut, BytesMut};
use std::net::IpAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encode a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// A missing bound address is written as `0.0.0.0:0`. IPv4-mapped IPv6
/// addresses use the 4-byte form.
pub fn encode_reply(
    code: Socks5ReplyCode,
    bind_addr: Option<&AddrSpec>,
) -> Result<BytesMut, Socks5Error> {
    let mut reply = BytesMut::with_capacity(22);
    reply.put_u8(SOCKS5_VERSION);
    reply.put_u8(code.into());
    reply.put_u8(SOCKS5_RESERVED);

    match bind_addr {
        None => {
            reply.put_u8(SOCKS5_ADDR_TYPE_IPV4);
            reply.put_slice(&[0, 0, 0, 0]);
            reply.put_u16(0);
        }
        Some(AddrSpec::Domain(domain, port)) => {
            if domain.len() > MAX_DOMAIN_LEN {
                return Err(Socks5Error::AddressFormat(format!(
                    "domain name of {} bytes exceeds {}",
                    domain.len(),
                    MAX_DOMAIN_LEN
                )));
            }
            reply.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
            reply.put_u8(domain.len() as u8);
            reply.put_slice(domain.as_bytes());
            reply.put_u16(*port);
        }
        Some(AddrSpec::Ip(addr)) => {
            match addr.ip() {
                IpAddr::V4(ip) => {
                    reply.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                    reply.put_slice(&ip.octets());
                }
                IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                    Some(v4) => {
                        reply.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                        reply.put_slice(&v4.octets());
                    }
                    None => {
                        reply.put_u8(SOCKS5_ADDR_TYPE_IPV6);
                        reply.put_slice(&ip.octets());
                    }
                },
            }
            reply.put_u16(addr.port());
        }
    }

    Ok(reply)
}

/// Encode and send a SOCKS5 reply
pub async fn send_reply<S>(
    stream: &mut S,
    code: Socks5ReplyCode,
    bind_addr: Option<&AddrSpec>,
) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    let reply = encode_reply(code, bind_addr)?;

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}
