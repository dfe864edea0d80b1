//! Relay server for meshpad rooms.
//!
//! The relay keeps an explicit registry of rooms and the connection occupying
//! each peer slot, announces newcomers, broadcasts occupancy and forwards
//! peer-addressed signaling envelopes verbatim. It never looks at document
//! content: once two peers have an open data channel the relay is out of the
//! data path.

mod app;
mod config;
mod room;
mod signaling;
mod transport;

pub use app::*;
pub use config::*;
pub use room::*;
pub use signaling::*;
pub use transport::*;
