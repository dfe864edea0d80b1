use crate::session::SessionState;
use meshpad_core::PeerId;

/// Notifications a session hands to its embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// The relay reported a new participant count for the room.
    PresenceChanged(usize),
    /// A peer's update was merged into the local document.
    DocumentChanged { from: PeerId },
    /// The document channel to a peer opened.
    PeerConnected(PeerId),
    /// The link to a peer was discarded.
    PeerLost(PeerId),
    StateChanged(SessionState),
}
