mod relay_connection;
mod relay_outbox;
mod session;
mod session_handle;
mod session_state;

pub use session::*;
pub use session_handle::*;
pub use session_state::*;
