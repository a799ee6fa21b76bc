use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// A participant's profile as it appears in `user_list`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub speak_lang: String,
    pub hear_lang: String,
}

/// Outbound chat events, serialized as `{ "event": <tag>, "data": {...} }`.
/// Field names and casing are the relay's wire contract — do not rename.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Acknowledgement sent to the originating connection only.
    ConnectionResponse {
        status: String,
        sid: ConnectionId,
    },

    UserJoined {
        username: String,
        speak_lang: String,
        hear_lang: String,
        timestamp: String,
    },

    /// Sent to a joining connection only; never broadcast.
    UserList {
        users: Vec<Profile>,
    },

    NewMessage {
        username: String,
        original_text: String,
        original_lang: String,
        timestamp: String,
        sid: ConnectionId,
    },

    NewVoiceMessage {
        username: String,
        audio_data: String,
        original_text: String,
        original_lang: String,
        timestamp: String,
        sid: ConnectionId,
    },

    UserTyping {
        username: String,
        is_typing: bool,
    },

    UserLeft {
        username: String,
        timestamp: String,
    },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionResponse { .. } => "connection_response",
            Self::UserJoined { .. } => "user_joined",
            Self::UserList { .. } => "user_list",
            Self::NewMessage { .. } => "new_message",
            Self::NewVoiceMessage { .. } => "new_voice_message",
            Self::UserTyping { .. } => "user_typing",
            Self::UserLeft { .. } => "user_left",
        }
    }

    /// Whether a room broadcast of this event skips the originating
    /// connection. Messages (text and voice) echo back to the sender;
    /// presence and typing notifications do not.
    pub fn excludes_sender(&self) -> bool {
        matches!(
            self,
            Self::UserJoined { .. } | Self::UserTyping { .. } | Self::UserLeft { .. }
        )
    }
}

/// Wall-clock timestamp in the `HH:MM:SS` form the chat clients display.
pub fn clock_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_wire_shape() {
        let event = ChatEvent::NewMessage {
            username: "Alice".into(),
            original_text: "Hello".into(),
            original_lang: "hi".into(),
            timestamp: "12:30:05".into(),
            sid: ConnectionId::from_raw("conn_abc"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new_message");
        assert_eq!(json["data"]["username"], "Alice");
        assert_eq!(json["data"]["original_text"], "Hello");
        assert_eq!(json["data"]["original_lang"], "hi");
        assert_eq!(json["data"]["sid"], "conn_abc");
    }

    #[test]
    fn user_list_wire_shape() {
        let event = ChatEvent::UserList {
            users: vec![Profile {
                username: "Alice".into(),
                speak_lang: "hi".into(),
                hear_lang: "en".into(),
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "user_list");
        assert_eq!(json["data"]["users"][0]["speak_lang"], "hi");
    }

    #[test]
    fn exclusion_matrix() {
        let joined = ChatEvent::UserJoined {
            username: "a".into(),
            speak_lang: "en".into(),
            hear_lang: "en".into(),
            timestamp: "00:00:00".into(),
        };
        let typing = ChatEvent::UserTyping { username: "a".into(), is_typing: true };
        let left = ChatEvent::UserLeft { username: "a".into(), timestamp: "00:00:00".into() };
        assert!(joined.excludes_sender());
        assert!(typing.excludes_sender());
        assert!(left.excludes_sender());

        let message = ChatEvent::NewMessage {
            username: "a".into(),
            original_text: "hi".into(),
            original_lang: "en".into(),
            timestamp: "00:00:00".into(),
            sid: ConnectionId::new(),
        };
        let voice = ChatEvent::NewVoiceMessage {
            username: "a".into(),
            audio_data: String::new(),
            original_text: String::new(),
            original_lang: "en".into(),
            timestamp: "00:00:00".into(),
            sid: ConnectionId::new(),
        };
        assert!(!message.excludes_sender());
        assert!(!voice.excludes_sender());
    }

    #[test]
    fn event_type_matches_wire_tag() {
        let event = ChatEvent::UserTyping { username: "a".into(), is_typing: false };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.event_type());
    }

    #[test]
    fn clock_time_format() {
        let ts = clock_time();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }

    #[test]
    fn serde_roundtrip() {
        let event = ChatEvent::UserLeft {
            username: "Bob".into(),
            timestamp: "23:59:59".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChatEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            ChatEvent::UserLeft { username, timestamp } => {
                assert_eq!(username, "Bob");
                assert_eq!(timestamp, "23:59:59");
            }
            other => panic!("expected user_left, got {other:?}"),
        }
    }
}
