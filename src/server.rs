//! SOCKS5 server lifecycle
//!
//! Binds the listening socket, runs the accept loop and spawns one handler
//! task per client. `stop` only stops accepting; connections already being
//! relayed run until their peers close them.

use crate::config::ServerConfig;
use crate::pool::BufferPool;
use crate::socks::{AuthRegistry, Socks5Handler};
use crate::transport::{accept_backoff, bind_listener, SocketOpts};
use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// A SOCKS5 server
#[derive(Debug)]
pub struct Socks5Server {
    config: ServerConfig,
    handler: Socks5Handler,
    socket_opts: SocketOpts,
    shutdown: CancellationToken,
    connections: TaskTracker,
}

impl Socks5Server {
    /// Build a server from its configuration
    ///
    /// No-authentication is always accepted; username/password is offered
    /// only when both are configured.
    pub fn new(config: ServerConfig) -> Self {
        let registry = AuthRegistry::with_credentials(config.credentials());
        debug!("Authentication methods: {:?}", registry.methods());
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);
        let handler = Socks5Handler::new(
            Arc::new(registry),
            BufferPool::default(),
            socket_opts.clone(),
        );

        Socks5Server {
            config,
            handler,
            socket_opts,
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }

    /// Bind `0.0.0.0:<port>`
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        bind_listener(addr).with_context(|| format!("Failed to listen on {}", addr))
    }

    /// Validate the configuration, bind and serve until stopped
    pub async fn start(&self) -> Result<()> {
        self.config.validate()?;
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Accept clients on `listener` until [`stop`](Self::stop) is called
    ///
    /// The listener is closed when this returns.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("SOCKS5 server listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("SOCKS5 server shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            self.socket_opts.hint(&stream);

                            let handler = self.handler.clone();
                            self.connections.spawn(async move {
                                if let Err(e) = handler.handle(stream, Some(peer)).await {
                                    if e.is_client_error() {
                                        debug!("SOCKS5 connection from {} rejected: {}", peer, e);
                                    } else {
                                        warn!("SOCKS5 connection from {} failed: {}", peer, e);
                                    }
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

    /// Number of connections still being served
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    /// Wait until every spawned connection has finished
    pub async fn wait_for_connections(&self) {
        self.connections.close();
        self.connections.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TcpConfig;
    use std::time::Duration;

    fn config(port: u16) -> ServerConfig {
        ServerConfig {
            port,
            username: None,
            password: None,
            tcp: TcpConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let server = Socks5Server::new(config(80));
        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("Port must be greater than 1024"));
    }

    #[tokio::test]
    async fn test_stop_ends_serve() {
        let server = Arc::new(Socks5Server::new(config(0)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(listener).await }
        });

        // Make sure the loop is up
        tokio::net::TcpStream::connect(addr).await.unwrap();

        server.stop();
        assert!(server.is_stopped());

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // The listener is closed once serve returns
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_before_serve() {
        let server = Socks5Server::new(config(0));
        server.stop();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.serve(listener).await.unwrap();
        server.wait_for_connections().await;
        assert_eq!(server.active_connections(), 0);
    }
}
