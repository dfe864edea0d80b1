mod ice;
mod peer;
mod room;
mod signaling;

pub use ice::{IceCandidate, IceServerConfig};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{Envelope, SdpKind, SessionDescription};
