use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Identity bound to one live session token. Read-only to everything past
/// the gate.
#[derive(Debug, Clone, Serialize)]
pub struct SessionIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// In-process session table. Tokens are opaque v4 UUIDs; nothing survives a
/// restart.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionIdentity>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, identity: SessionIdentity) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap()
            .insert(token.clone(), identity);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<SessionIdentity> {
        self.sessions.read().unwrap().get(token).cloned()
    }

    /// The gate itself: a request is admitted iff it carries a token that
    /// resolves to a live session. Absence is normal control flow.
    pub fn admit(&self, token: Option<&str>) -> bool {
        token.is_some_and(|t| self.sessions.read().unwrap().contains_key(t))
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn absent_session_is_not_admitted() {
        let store = SessionStore::new();
        assert!(!store.admit(None));
        assert!(!store.admit(Some("no-such-token")));
    }

    #[test]
    fn live_session_is_admitted_and_resolvable() {
        let store = SessionStore::new();
        let token = store.create(identity());
        assert!(store.admit(Some(&token)));
        assert_eq!(store.resolve(&token).unwrap().email, "ada@example.com");
    }

    #[test]
    fn revoked_session_is_gone() {
        let store = SessionStore::new();
        let token = store.create(identity());
        store.revoke(&token);
        assert!(!store.admit(Some(&token)));
        assert!(store.resolve(&token).is_none());
    }
}
