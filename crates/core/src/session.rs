use crate::menu::Step;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-subscriber conversation state for the SMS channel. Created lazily on
/// first contact and overwritten in place on every turn. There is no expiry
/// policy; `last_activity` is recorded so one can be layered on later.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub step: Step,
    pub pending: HashMap<String, String>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            step: Step::Menu,
            pending: HashMap::new(),
            last_activity: Utc::now(),
        }
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation state keyed by subscriber phone number.
///
/// `with_turn` runs a full read-modify-write turn while holding that
/// subscriber's entry locked, so concurrent webhook deliveries for the same
/// sender cannot lose updates. Independent subscribers never contend.
pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> ConversationSession;
    fn save(&self, key: &str, session: ConversationSession);
    fn with_turn(&self, key: &str, f: &mut dyn FnMut(&mut ConversationSession));
}

pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<ConversationSession>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Arc<Mutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::new())))
            .clone()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, key: &str) -> ConversationSession {
        self.entry(key).lock().expect("session poisoned").clone()
    }

    fn save(&self, key: &str, session: ConversationSession) {
        let entry = self.entry(key);
        *entry.lock().expect("session poisoned") = session;
    }

    fn with_turn(&self, key: &str, f: &mut dyn FnMut(&mut ConversationSession)) {
        let entry = self.entry(key);
        let mut session = entry.lock().expect("session poisoned");
        f(&mut session);
        session.last_activity = Utc::now();
    }
}
