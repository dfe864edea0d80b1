use std::fmt;

/// Connection state of a session towards the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joined,
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Joined => "joined",
            SessionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
