use crate::room::JoinOutcome;
use crate::signaling::RelayService;
use crate::transport::ConnectionHandle;
use meshpad_core::{Envelope, PeerId, RoomId};
use tracing::{debug, info, warn};

/// The (room, peer) slot a connection currently occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room: RoomId,
    pub peer_id: PeerId,
}

/// Protocol state of one websocket connection to the relay.
///
/// Text frames are fed in through [`RelayConnection::on_text`]; dropping the
/// connection through [`RelayConnection::close`] releases its slot.
pub struct RelayConnection {
    service: RelayService,
    handle: ConnectionHandle,
    membership: Option<Membership>,
}

impl RelayConnection {
    pub fn new(service: RelayService, handle: ConnectionHandle) -> Self {
        Self {
            service,
            handle,
            membership: None,
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    /// Handles one inbound text frame. Malformed frames are logged and dropped.
    pub fn on_text(&mut self, text: &str) {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Invalid envelope from connection {}: {}", self.handle.id(), e);
                return;
            }
        };

        match envelope {
            Envelope::Join { room, peer_id } => self.join(room, peer_id),
            Envelope::Offer { .. } | Envelope::Answer { .. } | Envelope::Candidate { .. } => {
                self.forward(&envelope, text)
            }
            Envelope::NewPeer { .. } | Envelope::ActiveUsers { .. } => warn!(
                "Connection {} sent server-only envelope '{}'",
                self.handle.id(),
                envelope.kind()
            ),
        }
    }

    /// Releases the slot held by this connection, if any.
    pub fn close(mut self) {
        self.leave_current();
        debug!("Relay connection {} closed", self.handle.id());
    }

    fn join(&mut self, room: RoomId, peer_id: PeerId) {
        if room.as_str().trim().is_empty() {
            warn!("Connection {} tried to join a blank room", self.handle.id());
            return;
        }

        let requested = Membership { room, peer_id };
        if self.membership.as_ref().is_some_and(|m| *m != requested) {
            self.leave_current();
        }

        let outcome = self
            .service
            .registry()
            .join(&requested.room, &requested.peer_id, &self.handle);
        if outcome != JoinOutcome::Rejoined {
            info!(
                "Connection {} registered as {} in room {}",
                self.handle.id(),
                requested.peer_id,
                requested.room
            );
        }
        self.membership = Some(requested);
    }

    fn forward(&self, envelope: &Envelope, text: &str) {
        let Some((room, to)) = envelope.route() else {
            return;
        };

        if self.service.registry().forward(room, to, text) {
            debug!("Forwarded {} to {} in room {}", envelope.kind(), to, room);
        } else {
            debug!(
                "Dropped {} for absent peer {} in room {}",
                envelope.kind(),
                to,
                room
            );
        }
    }

    fn leave_current(&mut self) {
        let Some(membership) = self.membership.take() else {
            return;
        };
        self.service
            .registry()
            .leave(&membership.room, &membership.peer_id, self.handle.id());
    }
}
