//! SOCKS5 module for Socksbridge
//!
//! This module implements the server side of the SOCKS5 protocol: method
//! negotiation, username/password authentication, request parsing and
//! replies, and the per-connection handler that ties them to the relay.

pub mod auth;
pub mod command;
pub mod consts;
mod handler;
mod resolver;
mod types;

pub use auth::{select_method, AuthRegistry, Authenticator, Credentials, NoAuth, PasswordAuth};
pub use command::{encode_reply, parse_request, send_reply, Request};
pub use handler::{Phase, Socks5Handler};
pub use resolver::Resolver;
pub use types::{AddrSpec, SocksCommand};
