use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};

use crate::models::BookingSession;

/// Storage for in-flight booking sessions, keyed by the conversation's
/// session key.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<BookingSession>;

    fn create(&self, key: &str) -> BookingSession;

    fn update(&self, key: &str, session: BookingSession);

    /// Returns whether a session was removed.
    fn evict(&self, key: &str) -> bool;

    /// Drops sessions idle for longer than `ttl`, returning how many went.
    fn evict_expired(&self, ttl: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, BookingSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, BookingSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Option<BookingSession> {
        self.sessions().get(key).cloned()
    }

    fn create(&self, key: &str) -> BookingSession {
        let session = BookingSession::new();
        self.sessions().insert(key.to_string(), session.clone());
        session
    }

    fn update(&self, key: &str, session: BookingSession) {
        self.sessions().insert(key.to_string(), session);
    }

    fn evict(&self, key: &str) -> bool {
        self.sessions().remove(key).is_some()
    }

    fn evict_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity > cutoff);
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions().len()
    }
}
