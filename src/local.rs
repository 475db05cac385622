//! Local forwarder
//!
//! Accepts application connections on a local port and tunnels each one,
//! byte for byte, to the configured remote endpoint. No SOCKS5 framing is
//! added on the way.

use crate::config::LocalConfig;
use crate::pool::BufferPool;
use crate::relay::relay;
use crate::transport::{accept_backoff, bind_listener, connect, SecureStream, SocketOpts};
use anyhow::{anyhow, Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// The local side of the proxy
#[derive(Debug)]
pub struct LocalForwarder {
    config: LocalConfig,
    pool: BufferPool,
    socket_opts: SocketOpts,
    shutdown: CancellationToken,
    connections: TaskTracker,
}

impl LocalForwarder {
    /// Build a forwarder from its configuration
    pub fn new(config: LocalConfig) -> Self {
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);
        LocalForwarder {
            config,
            pool: BufferPool::default(),
            socket_opts,
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }

    /// Resolve the configured remote address to a socket address
    pub async fn resolve_remote(&self) -> Result<SocketAddr> {
        let remote = &self.config.remote_address;
        lookup_host(remote.as_str())
            .await
            .with_context(|| format!("Failed to resolve remote address {}", remote))?
            .next()
            .ok_or_else(|| anyhow!("Remote address {} resolved to nothing", remote))
    }

    /// Bind `0.0.0.0:<port>`
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        bind_listener(addr).with_context(|| format!("Failed to listen on {}", addr))
    }

    /// Validate, resolve the remote, bind and serve until stopped
    pub async fn start(&self) -> Result<()> {
        self.config.validate()?;
        let remote = self.resolve_remote().await?;
        let listener = self.bind()?;
        self.serve(listener, remote).await
    }

    /// Forward every connection accepted on `listener` to `remote`
    pub async fn serve(&self, listener: TcpListener, remote: SocketAddr) -> Result<()> {
        info!(
            "Local forwarder listening on {}, forwarding to {}",
            listener.local_addr()?,
            remote
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Local forwarder shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            self.socket_opts.hint(&stream);

                            let pool = self.pool.clone();
                            let socket_opts = self.socket_opts.clone();
                            self.connections.spawn(async move {
                                if let Err(e) = forward(stream, peer, remote, &socket_opts, &pool).await {
                                    warn!("Forwarding {} to {} failed: {:#}", peer, remote, e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            accept_backoff(&self.shutdown).await;
                        }
                    }
                }
            }
        }

        drop(listener);
        Ok(())
    }

    /// Stop accepting new connections
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait until every spawned connection has finished
    pub async fn wait_for_connections(&self) {
        self.connections.close();
        self.connections.wait().await;
    }
}

/// Tunnel one accepted connection to the remote
async fn forward(
    inbound: TcpStream,
    peer: SocketAddr,
    remote: SocketAddr,
    socket_opts: &SocketOpts,
    pool: &BufferPool,
) -> Result<()> {
    let upstream = connect(remote, socket_opts)
        .await
        .with_context(|| format!("Failed to connect to remote {}", remote))?;

    let upstream = SecureStream::new(upstream);

    info!(
        "Proxy chain: {} -> {} -> {} -> {}",
        peer,
        display_addr(inbound.local_addr()),
        display_addr(upstream.get_ref().local_addr()),
        remote
    );

    let stats = relay(inbound, upstream, pool).await?;

    debug!(
        "Connection from {} closed: {} bytes up, {} bytes down",
        peer, stats.forward, stats.backward
    );
    Ok(())
}

fn display_addr(addr: std::io::Result<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|_| "?".to_string())
}
