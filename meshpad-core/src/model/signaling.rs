use crate::error::ProtocolError;
use crate::model::ice::IceCandidate;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// An SDP blob tagged with its role, matching `RTCSessionDescription.toJSON()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One JSON message on the relay connection.
///
/// `Join`, `Offer`, `Answer` and `Candidate` travel client → relay; the relay
/// forwards the last three unchanged to the peer named in `to`. `NewPeer` and
/// `ActiveUsers` are produced by the relay itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    Join {
        room: RoomId,
        #[serde(rename = "peerId")]
        peer_id: PeerId,
    },
    NewPeer {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        room: RoomId,
    },
    Offer {
        offer: SessionDescription,
        room: RoomId,
        to: PeerId,
        from: PeerId,
    },
    Answer {
        answer: SessionDescription,
        room: RoomId,
        to: PeerId,
        from: PeerId,
    },
    Candidate {
        candidate: IceCandidate,
        room: RoomId,
        to: PeerId,
        from: PeerId,
    },
    ActiveUsers {
        count: usize,
        room: RoomId,
    },
}

impl Envelope {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the envelope kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Join { .. } => "join",
            Envelope::NewPeer { .. } => "new-peer",
            Envelope::Offer { .. } => "offer",
            Envelope::Answer { .. } => "answer",
            Envelope::Candidate { .. } => "candidate",
            Envelope::ActiveUsers { .. } => "active-users",
        }
    }

    pub fn room(&self) -> &RoomId {
        match self {
            Envelope::Join { room, .. }
            | Envelope::NewPeer { room, .. }
            | Envelope::Offer { room, .. }
            | Envelope::Answer { room, .. }
            | Envelope::Candidate { room, .. }
            | Envelope::ActiveUsers { room, .. } => room,
        }
    }

    /// Room and recipient of a peer-addressed envelope.
    pub fn route(&self) -> Option<(&RoomId, &PeerId)> {
        match self {
            Envelope::Offer { room, to, .. }
            | Envelope::Answer { room, to, .. }
            | Envelope::Candidate { room, to, .. } => Some((room, to)),
            Envelope::Join { .. } | Envelope::NewPeer { .. } | Envelope::ActiveUsers { .. } => {
                None
            }
        }
    }
}
