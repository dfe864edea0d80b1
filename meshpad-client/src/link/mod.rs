mod convert;
mod framing;
mod link_event;
mod link_state;
mod peer_link;

pub use framing::{MAX_FRAME_SIZE, Reassembler, split_frames};
pub use link_event::*;
pub use link_state::*;
pub use peer_link::*;
