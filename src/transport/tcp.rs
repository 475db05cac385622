//! Plain TCP listening and dialing

use super::SocketOpts;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

const LISTEN_BACKLOG: i32 = 1024;

/// Pause between failed `accept` calls, e.g. while out of file descriptors
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Bind a listener with `SO_REUSEADDR` set
///
/// Lets a restarted side take its port back while old connections are still
/// in TIME_WAIT.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    TcpListener::from_std(socket.into())
}

/// Dial `addr` and apply socket options to the new stream
pub async fn connect(addr: SocketAddr, opts: &SocketOpts) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    opts.hint(&stream);

    tracing::debug!("TCP connection established to {}", addr);

    Ok(stream)
}

/// Sleep after a failed accept, returning early once `shutdown` fires
pub async fn accept_backoff(shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
    }
}
