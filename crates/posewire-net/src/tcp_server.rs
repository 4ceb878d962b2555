//! TCP server that accepts one tracker connection at a time.
//!
//! The server owns a dedicated network thread running a single-threaded tokio
//! runtime. It cycles `Listening → Connected → Listening` for as long as it
//! runs; a disconnect only sends it back to accepting. The listener stays
//! armed while a session is live, and a new connection replaces the current
//! one. Decoded messages go into an [`Inbox`] for the consumer thread to drain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use posewire_config::{ConfigError, MessageShape, ServerSection};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::framing::{FrameConfig, LineFramer};
use crate::inbox::Inbox;
use crate::messages::{self, Message};
use crate::platform::{self, SocketConfig};
use crate::session::{
    IdGenerator, OUTBOX_CAPACITY, OutboundSender, SessionId, SessionSlot, write_loop,
};

/// Name of the network thread, visible in logs and debuggers.
pub const NETWORK_THREAD_NAME: &str = "posewire-net";

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Configuration for [`TelemetryServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Default: `0.0.0.0:54750`.
    pub bind_addr: SocketAddr,
    /// Message layout expected on every session.
    pub shape: MessageShape,
    /// Framing limits.
    pub frame: FrameConfig,
    /// Bytes requested per socket read. Default: 1024.
    pub read_buffer_size: usize,
    /// Socket options.
    pub socket: SocketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 54750)),
            shape: MessageShape::Pose,
            frame: FrameConfig::default(),
            read_buffer_size: 1024,
            socket: SocketConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from the `server` section of the loaded config.
    pub fn from_section(section: &ServerSection) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: section.socket_addr()?,
            shape: section.shape,
            frame: FrameConfig {
                max_frame_len: section.max_frame_len,
            },
            read_buffer_size: section.read_buffer_size,
            socket: SocketConfig::default(),
        })
    }
}

/// Observable server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for a tracker to connect.
    Listening,
    /// Serving the given session.
    Connected(SessionId),
    /// Shut down; terminal.
    Stopped,
}

/// Errors raised while starting or stopping the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening address could not be bound. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The tokio runtime for the network thread could not be built.
    #[error("failed to build network runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The network thread could not be spawned.
    #[error("failed to spawn network thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The network thread panicked.
    #[error("network thread panicked")]
    ThreadPanic,
}

/// Telemetry ingest server. Call [`start`](Self::start) to bind and run.
pub struct TelemetryServer {
    config: ServerConfig,
    inbox: Inbox<Message>,
}

impl TelemetryServer {
    /// Create a server that delivers decoded messages into `inbox`.
    pub fn new(config: ServerConfig, inbox: Inbox<Message>) -> Self {
        Self { config, inbox }
    }

    /// Bind the listening socket and spawn the network thread.
    ///
    /// Binding happens before this returns, so an unavailable address is
    /// reported here as [`ServerError::Bind`] rather than later in the logs.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let addr = self.config.bind_addr;
        let bind_err = |source| ServerError::Bind { addr, source };

        let listener = platform::bind_listener(addr, &self.config.socket).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ServerState::Listening);
        let slot = SessionSlot::default();

        let worker = NetworkWorker {
            config: self.config,
            inbox: self.inbox,
            slot: slot.clone(),
            state: state_tx,
            shutdown: shutdown_rx,
            id_gen: Arc::new(IdGenerator::new()),
        };

        let thread = thread::Builder::new()
            .name(NETWORK_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(worker.run(listener)))
            .map_err(ServerError::Spawn)?;

        tracing::info!("Server listening on {local_addr}");

        Ok(ServerHandle {
            local_addr,
            sender: OutboundSender::new(slot),
            state: state_rx,
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }
}

/// Handle to a running server. Dropping it stops the server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    sender: OutboundSender,
    state: watch::Receiver<ServerState>,
    shutdown: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A sender that writes to whichever session is active.
    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.clone()
    }

    /// Close the listener and the active session, then join the network thread.
    pub fn stop(mut self) -> Result<(), ServerError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), ServerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // Fails only if the worker already exited.
        let _ = self.shutdown.send(true);
        thread.join().map_err(|_| ServerError::ThreadPanic)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            tracing::error!("Server shutdown failed: {e}");
        }
    }
}

/// How a session ended.
enum SessionEnd {
    PeerClosed,
    ReadError(std::io::Error),
    /// A newer connection arrived and takes over.
    Superseded(TcpStream, SocketAddr),
    Shutdown,
}

/// State owned by the network thread.
struct NetworkWorker {
    config: ServerConfig,
    inbox: Inbox<Message>,
    slot: SessionSlot,
    state: watch::Sender<ServerState>,
    shutdown: watch::Receiver<bool>,
    id_gen: Arc<IdGenerator>,
}

impl NetworkWorker {
    /// Accept loop. Returns only on shutdown.
    async fn run(self, listener: std::net::TcpListener) {
        let listener = match TcpListener::from_std(listener) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to register listener with runtime: {e}");
                self.state.send_replace(ServerState::Stopped);
                return;
            }
        };

        let mut shutdown = self.shutdown.clone();
        let mut next = None;

        loop {
            if self.shutting_down() {
                break;
            }

            let (stream, peer) = match next.take() {
                Some(connection) => connection,
                None => {
                    self.state.send_replace(ServerState::Listening);
                    tracing::debug!("Waiting for connection...");

                    let accepted = tokio::select! {
                        result = listener.accept() => result,
                        _ = shutdown.changed() => break,
                    };

                    match accepted {
                        Ok(connection) => connection,
                        Err(e) if self.shutting_down() => {
                            tracing::debug!("Accept interrupted by shutdown: {e}");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Accept failed: {e}");
                            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                            continue;
                        }
                    }
                }
            };

            next = self.serve_session(&listener, stream, peer).await;
        }

        self.state.send_replace(ServerState::Stopped);
        tracing::info!("Server stopped");
    }

    /// Serve one connection until it ends. Returns the connection that
    /// replaced it, if any.
    async fn serve_session(
        &self,
        listener: &TcpListener,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Option<(TcpStream, SocketAddr)> {
        let id = self.id_gen.next_id();
        if let Err(e) = platform::configure_stream(&stream, &self.config.socket) {
            tracing::warn!("Session {id}: failed to set socket options: {e}");
        }

        let (mut reader, writer) = stream.into_split();
        let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let writer_task = tokio::spawn(write_loop(id, writer, outbox_rx));

        self.slot.install(id, outbox_tx);
        self.state.send_replace(ServerState::Connected(id));
        tracing::info!("Session {id} connected from {peer}");

        let end = self.read_loop(id, listener, &mut reader).await;

        self.slot.clear(id);
        writer_task.abort();
        drop(reader);

        match end {
            SessionEnd::PeerClosed => tracing::warn!("Session {id} closed by peer"),
            SessionEnd::ReadError(e) if self.shutting_down() => {
                tracing::debug!("Session {id} read interrupted by shutdown: {e}");
            }
            SessionEnd::ReadError(e) => tracing::warn!("Session {id} read failed: {e}"),
            SessionEnd::Superseded(stream, next_peer) => {
                tracing::warn!("Session {id} replaced by a new connection from {next_peer}");
                return Some((stream, next_peer));
            }
            SessionEnd::Shutdown => tracing::info!("Session {id} closed for shutdown"),
        }
        None
    }

    async fn read_loop(
        &self,
        id: SessionId,
        listener: &TcpListener,
        reader: &mut OwnedReadHalf,
    ) -> SessionEnd {
        let mut shutdown = self.shutdown.clone();
        let mut framer = LineFramer::new(self.config.frame.clone());
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];

        loop {
            if self.shutting_down() {
                return SessionEnd::Shutdown;
            }

            let read = tokio::select! {
                result = reader.read(&mut buf) => result,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => return SessionEnd::Superseded(stream, peer),
                    Err(e) => {
                        tracing::warn!("Accept failed while session {id} active: {e}");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        continue;
                    }
                },
                _ = shutdown.changed() => return SessionEnd::Shutdown,
            };

            match read {
                Ok(0) => return SessionEnd::PeerClosed,
                Ok(n) => {
                    tracing::trace!("Session {id} received {n} bytes");
                    framer.extend(&buf[..n]);
                    self.deliver_frames(id, &mut framer);
                }
                Err(e) => return SessionEnd::ReadError(e),
            }
        }
    }

    /// Decode every complete frame and queue the valid ones.
    fn deliver_frames(&self, id: SessionId, framer: &mut LineFramer) {
        while let Some(frame) = framer.next_frame() {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Session {id}: {e}");
                    continue;
                }
            };

            match messages::decode(self.config.shape, &frame) {
                Ok(Some(message)) => self.inbox.push(message),
                Ok(None) => tracing::trace!("Session {id}: skipped blank frame"),
                Err(e) => tracing::warn!("Session {id}: dropping frame: {e}"),
            }
        }
    }

    fn shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
