pub mod relay_helpers;
pub mod test_client;
pub mod test_server;

pub use relay_helpers::*;
pub use test_client::*;
pub use test_server::*;
