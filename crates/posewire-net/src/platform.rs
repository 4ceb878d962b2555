//! Cross-platform TCP socket configuration.
//!
//! [`SocketConfig`] collects the socket options (TCP_NODELAY, keepalive,
//! SO_REUSEADDR, dual-stack IPv6) applied to the listener and to every
//! accepted session.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::TcpStream;

/// Listen backlog.
const LISTEN_BACKLOG: i32 = 16;

/// Socket options applied by the server.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm for lower latency. Default: true.
    pub tcp_nodelay: bool,
    /// Enable OS-level TCP keepalive. Default: true.
    pub keepalive_enabled: bool,
    /// Keepalive idle time before the first keepalive. Default: 60s.
    pub keepalive_idle: Duration,
    /// Keepalive retry interval. Default: 10s.
    pub keepalive_interval: Duration,
    /// Enable `SO_REUSEADDR` on the listener. Default: true except on Windows.
    pub reuse_addr: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            reuse_addr: !cfg!(target_os = "windows"),
        }
    }
}

/// Bind a non-blocking listener synchronously.
///
/// Binding outside the async runtime lets the caller see a bind failure
/// before any network thread exists.
pub fn bind_listener(
    addr: SocketAddr,
    config: &SocketConfig,
) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if config.reuse_addr {
        socket.set_reuse_address(true)?;
    }

    // Dual-stack: accept IPv4 peers on an IPv6 wildcard listener.
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}

/// Apply per-session options to an accepted stream.
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);
        SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}
