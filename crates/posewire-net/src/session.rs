//! Active-session bookkeeping and the outbound sender.
//!
//! At most one session is live at a time. The network thread installs it in a
//! shared [`SessionSlot`] on accept and clears it when the session ends; the
//! [`OutboundSender`] looks the slot up on every send. Sends hand the encoded
//! payload to the session's bounded outbox, drained by a writer task, so the
//! caller never waits on the socket.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::framing::{FrameError, write_frame};
use crate::messages::{EncodeError, Message, encode};

/// Encoded messages a session may have queued but not yet written. A peer
/// that stops reading fills this up and further sends fail with
/// [`SendError::OutboxFull`].
pub const OUTBOX_CAPACITY: usize = 256;

/// Identifier of one accepted connection, unique for the server's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Atomic generator for monotonically increasing [`SessionId`]s.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique [`SessionId`].
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors returned by [`OutboundSender`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No session is active.
    #[error("not connected")]
    NotConnected,

    /// The targeted session has been superseded by another one.
    #[error("session {requested} is no longer active (active: {active})")]
    StaleSession {
        /// Session the caller addressed.
        requested: SessionId,
        /// Session that is active now.
        active: SessionId,
    },

    /// The session's writer has stopped, usually because the peer went away.
    #[error("connection {0} is closed")]
    ConnectionClosed(SessionId),

    /// The peer is not draining its socket and the session's outbox is full.
    #[error("outbox for session {0} is full")]
    OutboxFull(SessionId),

    /// The message could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

struct ActiveSession {
    id: SessionId,
    outbox: mpsc::Sender<Vec<u8>>,
}

/// Shared slot holding the live session, if any.
#[derive(Clone, Default)]
pub(crate) struct SessionSlot {
    inner: Arc<Mutex<Option<ActiveSession>>>,
}

impl SessionSlot {
    /// Make `id` the active session, replacing any previous one.
    pub(crate) fn install(&self, id: SessionId, outbox: mpsc::Sender<Vec<u8>>) {
        *self.lock() = Some(ActiveSession { id, outbox });
    }

    /// Clear the slot if it still holds `id`.
    pub(crate) fn clear(&self, id: SessionId) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|active| active.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn current(&self) -> Option<SessionId> {
        self.lock().as_ref().map(|active| active.id)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle for writing messages to the active session.
///
/// Obtained from [`ServerHandle::sender`](crate::ServerHandle::sender).
#[derive(Clone)]
pub struct OutboundSender {
    slot: SessionSlot,
}

impl OutboundSender {
    pub(crate) fn new(slot: SessionSlot) -> Self {
        Self { slot }
    }

    /// Send `message` on whichever session is active.
    ///
    /// Returns the session the message was queued on.
    pub fn send(&self, message: &Message) -> Result<SessionId, SendError> {
        self.deliver(None, message)
    }

    /// Send `message` only if `session` is still the active session.
    pub fn send_to(&self, session: SessionId, message: &Message) -> Result<(), SendError> {
        self.deliver(Some(session), message).map(|_| ())
    }

    /// Currently active session, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        self.slot.current()
    }

    fn deliver(
        &self,
        expected: Option<SessionId>,
        message: &Message,
    ) -> Result<SessionId, SendError> {
        let payload = encode(message)?;

        let slot = self.slot.lock();
        let active = slot.as_ref().ok_or(SendError::NotConnected)?;

        if let Some(requested) = expected
            && requested != active.id
        {
            return Err(SendError::StaleSession {
                requested,
                active: active.id,
            });
        }

        active.outbox.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => SendError::OutboxFull(active.id),
            TrySendError::Closed(_) => SendError::ConnectionClosed(active.id),
        })?;
        Ok(active.id)
    }
}

impl fmt::Debug for OutboundSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundSender")
            .field("active_session", &self.active_session())
            .finish()
    }
}

/// Per-session writer task: drains the outbox onto the socket.
///
/// Exits on the first write failure, which closes the outbox so later sends
/// report [`SendError::ConnectionClosed`].
pub(crate) async fn write_loop(
    id: SessionId,
    mut writer: OwnedWriteHalf,
    mut outbox: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(payload) = outbox.recv().await {
        match write_frame(&mut writer, &payload).await {
            Ok(()) => tracing::trace!("Session {id} sent {} bytes", payload.len() + 1),
            Err(FrameError::Io(e)) => {
                tracing::warn!("Session {id} write failed: {e}");
                break;
            }
            Err(e) => tracing::warn!("Session {id} dropped outbound message: {e}"),
        }
    }
    outbox.close();
    let _ = writer.shutdown().await;
}
