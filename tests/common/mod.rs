//! Test utilities for Socksbridge
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksbridge::config::{LocalConfig, ServerConfig, TcpConfig};
use socksbridge::{LocalForwarder, Socks5Server};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Address on localhost that nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Start a TCP echo server; every accepted connection echoes until EOF
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut conn, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut r, mut w) = conn.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    addr
}

/// Test server configuration builder
#[derive(Default)]
pub struct TestConfigBuilder {
    username: Option<String>,
    password: Option<String>,
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Require username/password authentication
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            port: 0,
            username: self.username,
            password: self.password,
            tcp: TcpConfig::default(),
        }
    }
}

/// A server running on an ephemeral localhost port
pub struct TestServer {
    pub server: Arc<Socks5Server>,
    pub addr: SocketAddr,
    pub task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Start serving `config` on 127.0.0.1 with an ephemeral port
    pub async fn start(config: ServerConfig) -> Self {
        let server = Arc::new(Socks5Server::new(config));
        let (listener, addr) = create_test_listener().await;
        let task = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(listener).await }
        });
        TestServer { server, addr, task }
    }
}

/// A local forwarder running on an ephemeral localhost port
pub struct TestForwarder {
    pub forwarder: Arc<LocalForwarder>,
    pub addr: SocketAddr,
    pub task: JoinHandle<anyhow::Result<()>>,
}

impl TestForwarder {
    /// Forward an ephemeral localhost port to `remote`
    pub async fn start(remote: SocketAddr) -> Self {
        let forwarder = Arc::new(LocalForwarder::new(LocalConfig {
            remote_address: remote.to_string(),
            port: 0,
            tcp: TcpConfig::default(),
        }));
        let (listener, addr) = create_test_listener().await;
        let task = tokio::spawn({
            let forwarder = Arc::clone(&forwarder);
            async move { forwarder.serve(listener, remote).await }
        });
        TestForwarder {
            forwarder,
            addr,
            task,
        }
    }
}

/// Open a SOCKS5 CONNECT tunnel to `target` without authentication
///
/// Returns the stream positioned after the reply, plus the reply code.
pub async fn socks5_connect(proxy: SocketAddr, target: SocketAddr) -> (TcpStream, u8) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [5, 0]);

    let ip = match target {
        SocketAddr::V4(v4) => v4.ip().octets(),
        SocketAddr::V6(_) => panic!("tests only use IPv4 targets"),
    };
    stream
        .write_all(&socks5_mock::create_connect_ipv4(ip, target.port()))
        .await
        .unwrap();

    let reply = read_reply(&mut stream).await;
    (stream, reply[1])
}

/// Read a full reply, whatever its address type
pub async fn read_reply(stream: &mut TcpStream) -> Vec<u8> {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.unwrap();

    let rest_len = match head[3] {
        0x01 => 4 + 2,
        0x04 => 16 + 2,
        0x03 => {
            let len = stream.read_u8().await.unwrap() as usize;
            len + 2
        }
        other => panic!("unexpected address type {}", other),
    };
    let mut rest = vec![0u8; rest_len];
    stream.read_exact(&mut rest).await.unwrap();

    let mut reply = head.to_vec();
    reply.extend_from_slice(&rest);
    reply
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use socksbridge::socks::consts::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a password auth method selection request
    pub fn create_auth_request_password() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_PASSWORD]
    }

    /// Create a username/password sub-negotiation request
    pub fn create_password_auth(username: &str, password: &str) -> Vec<u8> {
        let mut data = vec![SOCKS5_AUTH_VERSION, username.len() as u8];
        data.extend_from_slice(username.as_bytes());
        data.push(password.len() as u8);
        data.extend_from_slice(password.as_bytes());
        data
    }

    /// Create a request with an arbitrary command to an IPv4 address
    pub fn create_request_ipv4(cmd: u8, ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut req = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED, SOCKS5_ADDR_TYPE_IPV4];
        req.extend_from_slice(&ip);
        req.extend_from_slice(&port.to_be_bytes());
        req
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        create_request_ipv4(SOCKS5_CMD_TCP_CONNECT, ip, port)
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        cmd.extend_from_slice(domain.as_bytes());
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }
}
