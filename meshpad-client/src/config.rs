use meshpad_core::IceServerConfig;
use meshpad_core::utils::{DEFAULT_RELAY_PORT, DEFAULT_STUN_ADDR};
use std::time::Duration;

/// Settings of a client session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Websocket URL of the relay server.
    pub signaling_url: String,
    /// STUN/TURN servers handed to every peer connection.
    pub ice_servers: Vec<IceServerConfig>,
    /// Pause between losing the relay connection and dialing again.
    pub reconnect_delay: Duration,
    /// Candidates kept per remote peer while no link exists yet; 0 drops them.
    pub candidate_buffer_limit: usize,
}

impl SessionConfig {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            ..Self::default()
        }
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_candidate_buffer_limit(mut self, limit: usize) -> Self {
        self.candidate_buffer_limit = limit;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: format!("ws://127.0.0.1:{}", DEFAULT_RELAY_PORT),
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            reconnect_delay: Duration::from_secs(1),
            candidate_buffer_limit: 16,
        }
    }
}
