//! Hand-off queue between the network thread and the consumer thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Insertion-ordered queue shared by one producer and one consumer.
///
/// The network thread [`push`](Self::push)es fully decoded messages; the
/// consumer takes everything at once with [`drain_all`](Self::drain_all).
/// Both sides hold the lock only long enough to append or swap the buffer,
/// so neither blocks on the other beyond brief contention.
pub struct Inbox<T> {
    queue: Arc<Mutex<Vec<T>>>,
}

impl<T> Inbox<T> {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append one item at the back.
    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    /// Remove and return every queued item in FIFO order, leaving the inbox empty.
    pub fn drain_all(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the inbox is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for Inbox<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Inbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox").field("len", &self.len()).finish()
    }
}
