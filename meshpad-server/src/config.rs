use meshpad_core::utils::DEFAULT_RELAY_PORT;
use std::net::{Ipv4Addr, SocketAddr};

/// Relay server settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
}

impl RelayConfig {
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_RELAY_PORT)),
        }
    }
}
