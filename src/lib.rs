//! # Socksbridge - SOCKS5 server and local forwarder
//!
//! Socksbridge is a two-sided proxy:
//!
//! - **Server side**: a SOCKS5 server supporting the CONNECT command with
//!   optional username/password authentication (RFC 1928, RFC 1929).
//! - **Local side**: a plain TCP forwarder that tunnels every local connection
//!   to a fixed remote endpoint, typically the server side.
//!
//! Both sides share the same relay engine: each connection is copied in both
//! directions by two tasks using pooled buffers, with half-close propagation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksbridge::config::ServerConfig;
//! use socksbridge::server::Socks5Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig { port: 1080, ..Default::default() };
//!     let server = Socks5Server::new(config);
//!     server.start().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Application -> socks5-local -> socks5-server (SOCKS5) -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod helper;
pub mod instance;
pub mod local;
pub mod pool;
pub mod process;
pub mod relay;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, LocalConfig, ServerConfig};
pub use error::{ConfigError, Socks5Error, Socks5ReplyCode};
pub use instance::Instance;
pub use local::LocalForwarder;
pub use server::Socks5Server;

/// Version of the Socksbridge library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
