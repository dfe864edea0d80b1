//! Client side of a meshpad room.
//!
//! A [`Session`] owns the relay connection for one room and turns relay
//! envelopes into direct WebRTC links to every other participant. The
//! [`MeshCoordinator`] it drives pushes local document updates over every open
//! link and applies what arrives from peers to the local [`DocumentEngine`].

mod config;
mod document;
mod error;
mod link;
mod mesh;
mod session;
mod signaling;

pub use config::*;
pub use document::*;
pub use error::*;
pub use link::*;
pub use mesh::*;
pub use session::*;
pub use signaling::*;
