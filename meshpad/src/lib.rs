pub use meshpad_core::ProtocolError;
pub use meshpad_core::model::{PeerId, RoomId};

pub mod model {
    pub use meshpad_core::model::*;
}

pub mod utils {
    pub use meshpad_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use meshpad_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshpad_client::*;
}
