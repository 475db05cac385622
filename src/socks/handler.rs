//! Per-connection SOCKS5 handler
//!
//! Drives one client connection from the greeting to the relay. The phases
//! always run in order:
//!
//! ```text
//! Handshaking -> Authenticating -> ParsingRequest -> [Resolving] -> Dialing -> Relaying -> Closed
//! ```
//!
//! Once the request has been read, every failure is answered with the most
//! specific reply code available before the connection is dropped.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::pool::BufferPool;
use crate::relay::relay;
use crate::socks::auth::{select_method, AuthRegistry};
use crate::socks::command::{parse_request, send_reply, Request};
use crate::socks::resolver::Resolver;
use crate::socks::types::{AddrSpec, SocksCommand};
use crate::transport::{connect, SocketOpts};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Where a connection is in its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading the greeting and picking a method
    Handshaking,
    /// Running the selected method's sub-negotiation
    Authenticating,
    /// Reading the request
    ParsingRequest,
    /// Looking up an FQDN destination
    Resolving,
    /// Connecting to the destination
    Dialing,
    /// Copying bytes both ways
    Relaying,
    /// Done
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Handshaking => "handshaking",
            Phase::Authenticating => "authenticating",
            Phase::ParsingRequest => "parsing request",
            Phase::Resolving => "resolving",
            Phase::Dialing => "dialing",
            Phase::Relaying => "relaying",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Shared, read-only state every connection handler works with
#[derive(Debug, Clone)]
pub struct Socks5Handler {
    registry: Arc<AuthRegistry>,
    pool: BufferPool,
    resolver: Resolver,
    socket_opts: SocketOpts,
}

impl Socks5Handler {
    /// Create a handler
    pub fn new(registry: Arc<AuthRegistry>, pool: BufferPool, socket_opts: SocketOpts) -> Self {
        Socks5Handler {
            registry,
            pool,
            resolver: Resolver,
            socket_opts,
        }
    }

    /// Serve one client connection to completion
    ///
    /// `peer` is the client's observed address, used for logging and
    /// attached to the parsed request.
    pub async fn handle<S>(&self, mut stream: S, peer: Option<SocketAddr>) -> Result<(), Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut phase = Phase::Handshaking;

        let (request, upstream) = match self.establish(&mut stream, peer, &mut phase).await {
            Ok(established) => established,
            Err(e) => {
                debug!("Connection from {:?} failed while {}: {}", peer, phase, e);
                return Err(e);
            }
        };

        phase = Phase::Relaying;
        info!(
            "SOCKS5 tunnel established {:?} -> {}",
            peer, request.destination
        );

        let stats = match relay(stream, upstream, &self.pool).await {
            Ok(stats) => stats,
            Err(e) => {
                debug!("Connection from {:?} failed while {}: {}", peer, phase, e);
                return Err(e.into());
            }
        };

        phase = Phase::Closed;
        debug!(
            "Connection from {:?} {}: {} bytes up, {} bytes down",
            peer, phase, stats.forward, stats.backward
        );
        Ok(())
    }

    /// Run every phase up to a connected upstream
    async fn establish<S>(
        &self,
        stream: &mut S,
        peer: Option<SocketAddr>,
        phase: &mut Phase,
    ) -> Result<(Request, TcpStream), Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let authenticator = select_method(stream, &self.registry).await?;

        *phase = Phase::Authenticating;
        authenticator.negotiate(stream).await?;

        *phase = Phase::ParsingRequest;
        let mut request = match parse_request(stream, peer).await {
            Ok(request) => request,
            Err(e @ Socks5Error::AddressTypeNotSupported(_)) => {
                reply_failure(stream, Socks5ReplyCode::AddressTypeNotSupported).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!("SOCKS5 {} request to {}", request.command, request.destination);

        if let Some(host) = request.destination.fqdn() {
            *phase = Phase::Resolving;
            match self.resolver.resolve(host).await {
                Ok(ip) => {
                    debug!("Resolved {} to {}", host, ip);
                    request.destination = request.destination.with_ip(ip);
                }
                Err(e) => {
                    reply_failure(stream, Socks5ReplyCode::HostUnreachable).await;
                    return Err(e);
                }
            }
        }

        match request.command {
            SocksCommand::Connect => {
                *phase = Phase::Dialing;
                let upstream = self.dial(stream, &request.destination).await?;
                Ok((request, upstream))
            }
            other => {
                reply_failure(stream, Socks5ReplyCode::CommandNotSupported).await;
                Err(Socks5Error::CommandNotSupported(other))
            }
        }
    }

    /// Connect to the resolved destination and send the final reply
    async fn dial<S>(&self, stream: &mut S, destination: &AddrSpec) -> Result<TcpStream, Socks5Error>
    where
        S: AsyncWrite + Unpin,
    {
        let target = match destination {
            AddrSpec::Ip(addr) => *addr,
            AddrSpec::Domain(_, _) => {
                return Err(Socks5Error::AddressFormat(format!(
                    "unresolved destination {}",
                    destination
                )));
            }
        };

        let upstream = match connect(target, &self.socket_opts).await {
            Ok(upstream) => upstream,
            Err(e) => {
                let code = Socks5ReplyCode::from(&e);
                reply_failure(stream, code).await;
                return Err(Socks5Error::Dial {
                    code,
                    target: target.to_string(),
                    source: e,
                });
            }
        };

        let bound = upstream.local_addr().ok().map(AddrSpec::from);
        send_reply(stream, Socks5ReplyCode::Succeeded, bound.as_ref()).await?;

        Ok(upstream)
    }
}

/// Best-effort failure reply; the connection is closed right after anyway
async fn reply_failure<S>(stream: &mut S, code: Socks5ReplyCode)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = send_reply(stream, code, None).await {
        debug!("Failed to send {:?} reply: {}", code, e);
    }
}
