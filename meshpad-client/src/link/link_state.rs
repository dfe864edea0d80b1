use std::fmt;

/// Lifecycle of a peer link. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Connected,
    Failed,
    Closed,
}

impl LinkState {
    fn rank(self) -> u8 {
        match self {
            LinkState::New => 0,
            LinkState::HaveLocalOffer | LinkState::HaveRemoteOffer => 1,
            LinkState::Connected => 2,
            LinkState::Failed => 3,
            LinkState::Closed => 4,
        }
    }

    pub fn can_advance_to(self, next: LinkState) -> bool {
        next.rank() > self.rank()
    }

    /// A terminal link is never reused.
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Failed | LinkState::Closed)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::New => "new",
            LinkState::HaveLocalOffer => "have-local-offer",
            LinkState::HaveRemoteOffer => "have-remote-offer",
            LinkState::Connected => "connected",
            LinkState::Failed => "failed",
            LinkState::Closed => "closed",
        };
        f.write_str(name)
    }
}
