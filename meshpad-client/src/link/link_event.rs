use bytes::Bytes;
use meshpad_core::PeerId;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Identifies one incarnation of a link to a peer. A replaced link gets a
/// fresh id so late callbacks from the old one can be told apart.
pub type LinkId = u64;

/// Transport events raised by a peer link's callbacks.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    ChannelOpen {
        peer: PeerId,
        link: LinkId,
    },
    Payload {
        peer: PeerId,
        link: LinkId,
        data: Bytes,
    },
    ChannelClosed {
        peer: PeerId,
        link: LinkId,
    },
    IceStateChanged {
        peer: PeerId,
        link: LinkId,
        state: RTCIceConnectionState,
    },
    ConnectionStateChanged {
        peer: PeerId,
        link: LinkId,
        state: RTCPeerConnectionState,
    },
}

impl LinkEvent {
    pub fn peer(&self) -> &PeerId {
        match self {
            LinkEvent::ChannelOpen { peer, .. }
            | LinkEvent::Payload { peer, .. }
            | LinkEvent::ChannelClosed { peer, .. }
            | LinkEvent::IceStateChanged { peer, .. }
            | LinkEvent::ConnectionStateChanged { peer, .. } => peer,
        }
    }

    pub fn link(&self) -> LinkId {
        match self {
            LinkEvent::ChannelOpen { link, .. }
            | LinkEvent::Payload { link, .. }
            | LinkEvent::ChannelClosed { link, .. }
            | LinkEvent::IceStateChanged { link, .. }
            | LinkEvent::ConnectionStateChanged { link, .. } => *link,
        }
    }
}
