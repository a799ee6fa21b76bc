use std::collections::HashSet;

use dashmap::DashMap;

use babel_core::ids::{ConnectionId, RoomId};

/// Room membership tables. Invariant: a disconnecting connection is
/// removed from every room via `leave_all`, so no room ever holds a
/// connection the participant registry no longer knows.
#[derive(Default)]
pub struct RoomSet {
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Idempotent: joining twice leaves the
    /// membership identical to joining once.
    pub fn join(&self, room: &RoomId, id: &ConnectionId) {
        self.rooms
            .entry(room.clone())
            .or_default()
            .insert(id.clone());
    }

    /// Remove a connection from one room. Leaving a non-member is a no-op.
    pub fn leave(&self, room: &RoomId, id: &ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(id);
        }
    }

    /// Remove a connection from every room it is in.
    pub fn leave_all(&self, id: &ConnectionId) {
        for mut entry in self.rooms.iter_mut() {
            entry.value_mut().remove(id);
        }
    }

    pub fn is_member(&self, room: &RoomId, id: &ConnectionId) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(id))
            .unwrap_or(false)
    }

    /// Current members of a room, in arbitrary order. Empty when the
    /// room does not exist.
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }
}
