use crate::room::{Room, SlotChange};
use crate::transport::{ConnectionHandle, ConnectionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use meshpad_core::{Envelope, PeerId, RoomId};
use std::sync::Arc;
use tracing::{debug, info};

/// What a `join` did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The peer took a free slot.
    Joined,
    /// The peer's slot moved from an older connection to this one.
    Reconnected,
    /// The same connection joined again; nothing was announced.
    Rejoined,
}

/// Process-wide registry of rooms.
///
/// Every operation on a room runs while holding that room's map entry, so a
/// membership change and the notices it triggers are applied as one step and
/// never interleave with another change to the same room. Notices are pushed
/// into unbounded per-connection channels, so no lock is held across an await.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer_id` in `room_id`, creating the room if needed.
    ///
    /// Other members receive `new-peer`, then every member receives the new
    /// occupancy.
    pub fn join(&self, room_id: &RoomId, peer_id: &PeerId, handle: &ConnectionHandle) -> JoinOutcome {
        let mut room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            Room::new(room_id.clone())
        });

        let outcome = match room.insert(peer_id.clone(), handle.clone()) {
            SlotChange::Unchanged => {
                debug!("Peer {} re-joined room {} on the same connection", peer_id, room_id);
                return JoinOutcome::Rejoined;
            }
            SlotChange::Inserted => JoinOutcome::Joined,
            SlotChange::Replaced(previous) => {
                info!(
                    "Peer {} moved from connection {} to {} in room {}",
                    peer_id,
                    previous,
                    handle.id(),
                    room_id
                );
                JoinOutcome::Reconnected
            }
        };

        let members = room.snapshot();
        let notice = Envelope::NewPeer {
            peer_id: peer_id.clone(),
            room: room_id.clone(),
        };
        for (member_id, member) in &members {
            if member_id != peer_id {
                member.send_envelope(&notice);
            }
        }
        broadcast_occupancy(room_id, &members);

        info!("Peer {} joined room {} ({} present)", peer_id, room_id, members.len());
        outcome
    }

    /// Frees the slot of `peer_id` if `connection` still holds it.
    ///
    /// Deletes the room when it becomes empty, otherwise tells the remaining
    /// members the new occupancy.
    pub fn leave(&self, room_id: &RoomId, peer_id: &PeerId, connection: ConnectionId) -> bool {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) else {
            return false;
        };

        if !entry.get_mut().remove(peer_id, connection) {
            debug!(
                "Ignoring leave of {} from stale connection {}",
                peer_id, connection
            );
            return false;
        }

        if entry.get().is_empty() {
            entry.remove();
            info!("Peer {} left; room {} is empty and was deleted", peer_id, room_id);
        } else {
            let members = entry.get().snapshot();
            broadcast_occupancy(room_id, &members);
            info!("Peer {} left room {} ({} remain)", peer_id, room_id, members.len());
        }
        true
    }

    /// Sends `text` to the connection registered as `to` in `room_id`.
    ///
    /// Returns `false` when the room, the peer or its connection is gone.
    pub fn forward(&self, room_id: &RoomId, to: &PeerId, text: &str) -> bool {
        let Some(room) = self.rooms.get(room_id) else {
            return false;
        };
        let Some(handle) = room.get(to) else {
            return false;
        };
        handle.is_open() && handle.send_text(text)
    }

    pub fn room_size(&self, room_id: &RoomId) -> Option<usize> {
        self.rooms.get(room_id).map(|room| room.len())
    }

    pub fn contains_peer(&self, room_id: &RoomId, peer_id: &PeerId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.contains(peer_id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self) -> usize {
        self.rooms.iter().map(|room| room.len()).sum()
    }
}

fn broadcast_occupancy(room_id: &RoomId, members: &[(PeerId, ConnectionHandle)]) {
    let notice = Envelope::ActiveUsers {
        count: members.len(),
        room: room_id.clone(),
    };
    for (_, member) in members {
        member.send_envelope(&notice);
    }
}
