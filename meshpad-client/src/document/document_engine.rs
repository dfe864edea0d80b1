use crate::error::DocumentError;
use bytes::Bytes;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Where a committed document update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Local,
    Remote,
}

/// Opaque CRDT update emitted by a [`DocumentEngine`].
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub origin: UpdateOrigin,
    pub payload: Bytes,
}

/// The replicated document the mesh keeps in sync.
///
/// Updates are opaque byte payloads. Applying the same update twice, or
/// applying concurrent updates in any order, must converge to the same state.
pub trait DocumentEngine: Send + Sync + 'static {
    /// Stream of every update committed to the document, tagged with its
    /// origin. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<DocumentUpdate>;

    /// Merges an update received from a peer. Subscribers see it with
    /// [`UpdateOrigin::Remote`].
    fn apply_remote_update(&self, update: &[u8]) -> Result<(), DocumentError>;

    /// Encodes the complete document state as a single update.
    fn encode_full_state(&self) -> Vec<u8>;
}

/// Fan-out of committed updates to every live subscriber.
#[derive(Debug, Default)]
pub struct UpdateListeners {
    senders: Mutex<Vec<mpsc::UnboundedSender<DocumentUpdate>>>,
}

impl UpdateListeners {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DocumentUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, origin: UpdateOrigin, payload: Vec<u8>) {
        let update = DocumentUpdate {
            origin,
            payload: Bytes::from(payload),
        };
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(update.clone()).is_ok());
    }
}
