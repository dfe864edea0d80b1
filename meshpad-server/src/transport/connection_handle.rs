use axum::extract::ws::Message;
use meshpad_core::Envelope;
use std::fmt;
use tokio::sync::mpsc;
use tracing::error;
use uuid::Uuid;

/// Identity of one websocket connection to the relay.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write side of a relay connection, as stored in a room slot.
///
/// Frames are pushed into the connection's writer task through an unbounded
/// channel, so sending never blocks the caller. Once the writer task is gone
/// the handle reports itself closed and every send becomes a no-op.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a text frame. Returns `false` if the connection is already closed.
    pub fn send_text(&self, text: &str) -> bool {
        self.tx.send(Message::Text(text.into())).is_ok()
    }

    pub fn send_envelope(&self, envelope: &Envelope) -> bool {
        match envelope.to_json() {
            Ok(json) => self.send_text(&json),
            Err(e) => {
                error!("Failed to serialize {} envelope: {}", envelope.kind(), e);
                false
            }
        }
    }
}
