use dashmap::DashMap;

use babel_core::events::Profile;
use babel_core::ids::ConnectionId;

/// Maps active connections to the participant profile supplied at join
/// time. Pure in-memory state, scoped to the process lifetime; an owned
/// service object so tests can construct isolated instances.
#[derive(Default)]
pub struct ParticipantRegistry {
    participants: DashMap<ConnectionId, Profile>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the profile for a connection. Always succeeds;
    /// no validation — callers apply defaults at the ingestion boundary.
    pub fn register(&self, id: ConnectionId, profile: Profile) {
        self.participants.insert(id, profile);
    }

    /// Remove a participant. No-op when absent.
    pub fn unregister(&self, id: &ConnectionId) {
        self.participants.remove(id);
    }

    /// Membership check used by every protocol handler before acting.
    pub fn lookup(&self, id: &ConnectionId) -> Option<Profile> {
        self.participants.get(id).map(|entry| entry.value().clone())
    }

    /// All current profiles, in arbitrary order.
    pub fn list_all(&self) -> Vec<Profile> {
        self.participants
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, speak: &str, hear: &str) -> Profile {
        Profile {
            username: name.into(),
            speak_lang: speak.into(),
            hear_lang: hear.into(),
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = ParticipantRegistry::new();
        let id = ConnectionId::new();

        registry.register(id.clone(), profile("Alice", "hi", "en"));

        let found = registry.lookup(&id).unwrap();
        assert_eq!(found.username, "Alice");
        assert_eq!(found.speak_lang, "hi");
        assert_eq!(found.hear_lang, "en");
    }

    #[test]
    fn rejoin_overwrites() {
        let registry = ParticipantRegistry::new();
        let id = ConnectionId::new();

        registry.register(id.clone(), profile("Alice", "hi", "en"));
        registry.register(id.clone(), profile("Alicia", "es", "fr"));

        assert_eq!(registry.count(), 1);
        let found = registry.lookup(&id).unwrap();
        assert_eq!(found.username, "Alicia");
        assert_eq!(found.speak_lang, "es");
    }

    #[test]
    fn unregister_is_noop_when_absent() {
        let registry = ParticipantRegistry::new();
        let id = ConnectionId::new();

        registry.unregister(&id); // never registered
        assert_eq!(registry.count(), 0);

        registry.register(id.clone(), profile("Bob", "en", "en"));
        registry.unregister(&id);
        registry.unregister(&id); // second removal
        assert_eq!(registry.count(), 0);
        assert!(registry.lookup(&id).is_none());
    }

    #[test]
    fn list_all_returns_every_profile() {
        let registry = ParticipantRegistry::new();
        registry.register(ConnectionId::new(), profile("Alice", "hi", "en"));
        registry.register(ConnectionId::new(), profile("Bob", "en", "hi"));

        let mut names: Vec<String> = registry.list_all().into_iter().map(|p| p.username).collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }
}
