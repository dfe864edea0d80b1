//! Shared vocabulary of the meshpad relay protocol.
//!
//! Both the relay server and the client session speak in terms of the types
//! defined here: room and peer identifiers, the JSON [`Envelope`] exchanged
//! over the relay websocket, and the ICE server configuration handed to
//! WebRTC peer connections.

pub mod error;
pub mod model;
pub mod utils;

pub use error::ProtocolError;
pub use model::{
    Envelope, IceCandidate, IceServerConfig, PeerId, RoomId, SdpKind, SessionDescription,
};
