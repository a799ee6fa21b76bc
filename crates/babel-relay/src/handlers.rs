//! Session protocol handling: join, message, voice, typing, disconnect.
//!
//! Guard failures are intentional no-ops. An event from a connection the
//! participant registry does not know is dropped without any reply to the
//! sender, and nothing here can take down another connection's session.

use std::sync::Arc;

use babel_core::events::{clock_time, ChatEvent};
use babel_core::ids::{ConnectionId, RoomId};
use babel_telemetry::MetricsRecorder;
use babel_translate::Translator;

use crate::client::ClientRegistry;
use crate::fanout::RoomFanout;
use crate::registry::ParticipantRegistry;
use crate::rooms::RoomSet;
use crate::wire::{self, ClientEvent};

/// Everything the protocol handlers operate on. One instance per process,
/// constructed at startup and shared by reference; tests build isolated
/// instances.
pub struct ChatState {
    pub clients: Arc<ClientRegistry>,
    pub participants: ParticipantRegistry,
    pub rooms: Arc<RoomSet>,
    pub fanout: RoomFanout,
    pub translator: Arc<dyn Translator>,
    pub metrics: Option<Arc<MetricsRecorder>>,
}

impl ChatState {
    pub fn new(clients: Arc<ClientRegistry>, translator: Arc<dyn Translator>) -> Self {
        let rooms = Arc::new(RoomSet::new());
        let fanout = RoomFanout::new(Arc::clone(&clients), Arc::clone(&rooms));
        Self {
            clients,
            participants: ParticipantRegistry::new(),
            rooms,
            fanout,
            translator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn count_event(&self, event: &str) {
        if let Some(m) = &self.metrics {
            m.counter_inc("relay.events.total", &[("event", event)], 1);
        }
    }
}

/// Acknowledge a fresh connection to the originating channel only.
pub fn on_connect(state: &ChatState, id: &ConnectionId) {
    tracing::info!(connection_id = %id, "client connected");
    let ack = ChatEvent::ConnectionResponse {
        status: "connected".to_string(),
        sid: id.clone(),
    };
    state.fanout.unicast(id, &ack);
}

/// Decode and route one inbound frame. Undecodable frames are dropped
/// with a warn — never an error back to the sender.
pub fn dispatch(state: &ChatState, id: &ConnectionId, raw: &str) {
    let event = match wire::decode(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(connection_id = %id, "dropping inbound frame: {e}");
            return;
        }
    };

    match event {
        ClientEvent::JoinChat {
            username,
            speak_lang,
            hear_lang,
        } => {
            state.count_event("join_chat");
            join_chat(state, id, username, speak_lang, hear_lang);
        }
        ClientEvent::SendMessage { original_text } => {
            state.count_event("send_message");
            send_message(state, id, original_text.unwrap_or_default());
        }
        ClientEvent::SendVoice {
            audio_data,
            original_text,
        } => {
            state.count_event("send_voice");
            send_voice(
                state,
                id,
                audio_data.unwrap_or_default(),
                original_text.unwrap_or_default(),
            );
        }
        ClientEvent::Typing { is_typing } => {
            state.count_event("typing");
            typing(state, id, is_typing.unwrap_or(false));
        }
    }
}

/// Remove a departing connection from the chat. Idempotent and valid in
/// any state: a connection that never joined produces no broadcast.
pub fn on_disconnect(state: &ChatState, id: &ConnectionId) {
    tracing::info!(connection_id = %id, "client disconnected");
    let Some(profile) = state.participants.lookup(id) else {
        return;
    };

    broadcast_room(
        state,
        id,
        &RoomId::global(),
        ChatEvent::UserLeft {
            username: profile.username.clone(),
            timestamp: clock_time(),
        },
    );

    state.participants.unregister(id);
    state.rooms.leave_all(id);
    tracing::info!(connection_id = %id, username = %profile.username, "left the chat");
}

fn join_chat(
    state: &ChatState,
    id: &ConnectionId,
    username: Option<String>,
    speak_lang: Option<String>,
    hear_lang: Option<String>,
) {
    let profile = wire::profile_with_defaults(username, speak_lang, hear_lang);

    // A re-join simply overwrites the previous profile
    state.participants.register(id.clone(), profile.clone());
    let room = RoomId::global();
    state.rooms.join(&room, id);

    broadcast_room(
        state,
        id,
        &room,
        ChatEvent::UserJoined {
            username: profile.username.clone(),
            speak_lang: profile.speak_lang.clone(),
            hear_lang: profile.hear_lang.clone(),
            timestamp: clock_time(),
        },
    );

    // Current roster, joiner included, to the joiner only
    let listing = ChatEvent::UserList {
        users: state.participants.list_all(),
    };
    state.fanout.unicast(id, &listing);

    tracing::info!(connection_id = %id, username = %profile.username, "joined the chat");
}

fn send_message(state: &ChatState, id: &ConnectionId, text: String) {
    let Some(profile) = state.participants.lookup(id) else {
        tracing::debug!(connection_id = %id, "message from unregistered connection dropped");
        return;
    };

    broadcast_room(
        state,
        id,
        &RoomId::global(),
        ChatEvent::NewMessage {
            username: profile.username,
            original_text: text,
            original_lang: profile.speak_lang,
            timestamp: clock_time(),
            sid: id.clone(),
        },
    );
}

fn send_voice(state: &ChatState, id: &ConnectionId, audio_data: String, text: String) {
    let Some(profile) = state.participants.lookup(id) else {
        tracing::debug!(connection_id = %id, "voice message from unregistered connection dropped");
        return;
    };

    // The payload is moved into the event and dropped with it after
    // delivery; nothing of it outlives this call.
    broadcast_room(
        state,
        id,
        &RoomId::global(),
        ChatEvent::NewVoiceMessage {
            username: profile.username,
            audio_data,
            original_text: text,
            original_lang: profile.speak_lang,
            timestamp: clock_time(),
            sid: id.clone(),
        },
    );
}

fn typing(state: &ChatState, id: &ConnectionId, is_typing: bool) {
    let Some(profile) = state.participants.lookup(id) else {
        tracing::debug!(connection_id = %id, "typing event from unregistered connection dropped");
        return;
    };

    broadcast_room(
        state,
        id,
        &RoomId::global(),
        ChatEvent::UserTyping {
            username: profile.username,
            is_typing,
        },
    );
}

/// Broadcast to a room with the exclusion rule the event itself defines.
fn broadcast_room(state: &ChatState, sender: &ConnectionId, room: &RoomId, event: ChatEvent) {
    let exclude = if event.excludes_sender() {
        Some(sender)
    } else {
        None
    };
    let delivered = state.fanout.broadcast(room, &event, exclude);
    if let Some(m) = &state.metrics {
        m.counter_inc("relay.broadcasts.total", &[("event", event.event_type())], 1);
        m.counter_inc("relay.deliveries.total", &[], delivered as u64);
    }
}
