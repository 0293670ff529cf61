//! FIFO queue of pending reply destinations
//!
//! The RTM transport does not carry a correlation token from a reply
//! acknowledgment back to the message that triggered it, so attachment
//! delivery falls back to temporal ordering: the Nth acknowledgment is
//! matched with the Nth destination pushed here. Entries are opaque
//! destination handles (channel ids), not papers; the queue carries
//! *where to send*, never *what to send*.
//!
//! Invariant: entry count equals the number of resolved results still
//! awaiting attachment delivery. One push per successfully resolved paper
//! at the moment its plain summary goes out, one pop per ack-driven
//! attachment post.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe FIFO of channel ids awaiting one matched result each.
///
/// Cloning yields another handle to the same queue, so the event loop and
/// the trend job share it without ambient global state.
#[derive(Clone, Default)]
pub struct DestinationQueue {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl DestinationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `destination` is awaiting one matched result.
    pub async fn push_back(&self, destination: String) {
        self.inner.lock().await.push_back(destination);
    }

    /// Take the destination for the next completed result, in push order.
    ///
    /// `None` means the queue was empty. Under correct sequencing that never
    /// happens; callers must treat it as a sequencing bug, log loudly and
    /// drop the item rather than invent a destination.
    pub async fn pop_front(&self) -> Option<String> {
        self.inner.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
