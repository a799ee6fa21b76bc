use std::sync::Arc;

use babel_core::events::ChatEvent;
use babel_core::ids::{ConnectionId, RoomId};

use crate::client::ClientRegistry;
use crate::rooms::RoomSet;

/// Apply the exclusion predicate to a membership snapshot. Kept a pure
/// function so fan-out logic is testable apart from transport mechanics.
pub fn recipients(
    members: &[ConnectionId],
    exclude: Option<&ConnectionId>,
) -> Vec<ConnectionId> {
    members
        .iter()
        .filter(|id| exclude != Some(*id))
        .cloned()
        .collect()
}

/// Delivers events to every member of a room. A failed send to one
/// member is logged and skipped, never propagated — the rest of the room
/// still receives the event.
pub struct RoomFanout {
    clients: Arc<ClientRegistry>,
    rooms: Arc<RoomSet>,
}

impl RoomFanout {
    pub fn new(clients: Arc<ClientRegistry>, rooms: Arc<RoomSet>) -> Self {
        Self { clients, rooms }
    }

    /// Broadcast an event to a room, optionally skipping the sender.
    /// Returns the number of members the event was queued for.
    pub fn broadcast(
        &self,
        room: &RoomId,
        event: &ChatEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(event = event.event_type(), "failed to encode event: {e}");
                return 0;
            }
        };

        let members = self.rooms.members(room);
        let mut delivered = 0;
        for id in recipients(&members, exclude) {
            if self.clients.send_to(&id, payload.clone()) {
                delivered += 1;
            } else {
                tracing::debug!(
                    connection_id = %id,
                    room = %room,
                    event = event.event_type(),
                    "skipped unreachable room member"
                );
            }
        }
        delivered
    }

    /// Deliver an event to one connection only (acknowledgements, user
    /// lists). Best-effort like `broadcast`.
    pub fn unicast(&self, id: &ConnectionId, event: &ChatEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(payload) => self.clients.send_to(id, payload),
            Err(e) => {
                tracing::error!(event = event.event_type(), "failed to encode event: {e}");
                false
            }
        }
    }
}
