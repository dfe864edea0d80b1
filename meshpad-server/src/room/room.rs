use crate::transport::{ConnectionHandle, ConnectionId};
use meshpad_core::{PeerId, RoomId};
use std::collections::HashMap;

/// Result of placing a connection into a peer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// The slot was empty.
    Inserted,
    /// The slot held another connection, which has been evicted.
    Replaced(ConnectionId),
    /// The slot already held this very connection.
    Unchanged,
}

/// Membership of one room: at most one connection per peer id.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: HashMap<PeerId, ConnectionHandle>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.members.contains_key(peer_id)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&ConnectionHandle> {
        self.members.get(peer_id)
    }

    pub fn insert(&mut self, peer_id: PeerId, handle: ConnectionHandle) -> SlotChange {
        match self.members.insert(peer_id, handle.clone()) {
            None => SlotChange::Inserted,
            Some(previous) if previous.id() == handle.id() => SlotChange::Unchanged,
            Some(previous) => SlotChange::Replaced(previous.id()),
        }
    }

    /// Frees the slot of `peer_id` if it is still held by `connection`.
    ///
    /// A peer that re-joined from a newer connection keeps its slot when the
    /// stale connection finally closes.
    pub fn remove(&mut self, peer_id: &PeerId, connection: ConnectionId) -> bool {
        match self.members.get(peer_id) {
            Some(handle) if handle.id() == connection => {
                self.members.remove(peer_id);
                true
            }
            _ => false,
        }
    }

    /// Copy of the current members, taken atomically for broadcasting.
    pub fn snapshot(&self) -> Vec<(PeerId, ConnectionHandle)> {
        self.members
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect()
    }
}
