pub mod fake_relay;
pub mod mesh_helpers;
pub mod mock_signaling;

pub use fake_relay::*;
pub use mesh_helpers::*;
pub use test_node::*;
pub use test_relay::*;
