//! SOCKS5 command module
//!
//! Handles parsing SOCKS5 requests and building replies.

mod parser;
mod reply;

pub use parser::{parse_request, Request};
pub use reply::{encode_reply, send_reply};
