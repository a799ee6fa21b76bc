use serde::Deserialize;

use babel_core::events::Profile;
use babel_core::ids::ConnectionId;

/// What the transport feeds the protocol event loop. Frames and closes
/// travel through the same queue, so one consumer sees them in order and
/// all registry mutation stays on a single task.
#[derive(Debug)]
pub enum InboundEvent {
    Frame(ConnectionId, String),
    Closed(ConnectionId),
}

/// Defaults applied once, here, at the ingestion boundary. Handlers only
/// ever see fully-populated values.
pub const DEFAULT_USERNAME: &str = "Anonymous";
pub const DEFAULT_LANG: &str = "en";

/// Inbound client events, carried as `{ "event": <tag>, "data": {...} }`.
/// Every payload field is optional on the wire; missing fields are
/// defaulted, not rejected.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinChat {
        username: Option<String>,
        speak_lang: Option<String>,
        hear_lang: Option<String>,
    },
    SendMessage {
        original_text: Option<String>,
    },
    SendVoice {
        audio_data: Option<String>,
        original_text: Option<String>,
    },
    Typing {
        is_typing: Option<bool>,
    },
}

const KNOWN_EVENTS: &[&str] = &["join_chat", "send_message", "send_voice", "typing"];

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// Decode one inbound text frame. The caller drops failures with a warn;
/// a bad frame is never an error surfaced to the sender.
pub fn decode(raw: &str) -> Result<ClientEvent, WireError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| WireError::Malformed(e.to_string()))?;

    let event_name = value
        .get("event")
        .and_then(|v| v.as_str())
        .map(str::to_owned);

    match serde_json::from_value::<ClientEvent>(value) {
        Ok(event) => Ok(event),
        Err(e) => match event_name {
            Some(name) if !KNOWN_EVENTS.contains(&name.as_str()) => {
                Err(WireError::UnknownEvent(name))
            }
            _ => Err(WireError::Malformed(e.to_string())),
        },
    }
}

/// The explicit defaulting step for join payloads.
pub fn profile_with_defaults(
    username: Option<String>,
    speak_lang: Option<String>,
    hear_lang: Option<String>,
) -> Profile {
    Profile {
        username: username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        speak_lang: speak_lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
        hear_lang: hear_lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_join_chat() {
        let raw = r#"{"event":"join_chat","data":{"username":"Alice","speak_lang":"hi","hear_lang":"en"}}"#;
        match decode(raw).unwrap() {
            ClientEvent::JoinChat {
                username,
                speak_lang,
                hear_lang,
            } => {
                assert_eq!(username.as_deref(), Some("Alice"));
                assert_eq!(speak_lang.as_deref(), Some("hi"));
                assert_eq!(hear_lang.as_deref(), Some("en"));
            }
            other => panic!("expected join_chat, got {other:?}"),
        }
    }

    #[test]
    fn decode_join_chat_with_empty_data() {
        let raw = r#"{"event":"join_chat","data":{}}"#;
        match decode(raw).unwrap() {
            ClientEvent::JoinChat { username, .. } => assert!(username.is_none()),
            other => panic!("expected join_chat, got {other:?}"),
        }
    }

    #[test]
    fn decode_send_message() {
        let raw = r#"{"event":"send_message","data":{"original_text":"Hello"}}"#;
        match decode(raw).unwrap() {
            ClientEvent::SendMessage { original_text } => {
                assert_eq!(original_text.as_deref(), Some("Hello"));
            }
            other => panic!("expected send_message, got {other:?}"),
        }
    }

    #[test]
    fn decode_typing() {
        let raw = r#"{"event":"typing","data":{"is_typing":true}}"#;
        match decode(raw).unwrap() {
            ClientEvent::Typing { is_typing } => assert_eq!(is_typing, Some(true)),
            other => panic!("expected typing, got {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_event() {
        let raw = r#"{"event":"shout","data":{"volume":11}}"#;
        match decode(raw) {
            Err(WireError::UnknownEvent(name)) => assert_eq!(name, "shout"),
            other => panic!("expected unknown event, got {other:?}"),
        }
    }

    #[test]
    fn decode_invalid_json() {
        assert!(matches!(decode("not json"), Err(WireError::Malformed(_))));
    }

    #[test]
    fn decode_non_object_frame() {
        assert!(matches!(decode("[1,2,3]"), Err(WireError::Malformed(_))));
    }

    #[test]
    fn join_defaults() {
        let profile = profile_with_defaults(None, None, None);
        assert_eq!(profile.username, "Anonymous");
        assert_eq!(profile.speak_lang, "en");
        assert_eq!(profile.hear_lang, "en");
    }

    #[test]
    fn join_defaults_keep_supplied_values() {
        let profile = profile_with_defaults(Some("Alice".into()), Some("hi".into()), None);
        assert_eq!(profile.username, "Alice");
        assert_eq!(profile.speak_lang, "hi");
        assert_eq!(profile.hear_lang, "en");
    }
}
