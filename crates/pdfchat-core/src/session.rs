use crate::SessionData;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug)]
struct Entry {
    data: SessionData,
    last_accessed: Instant,
}

/// Process-local session storage used when no Redis URL is configured.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Entry>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn get(&mut self, session_id: &Uuid) -> Option<SessionData> {
        self.sessions.get_mut(session_id).map(|entry| {
            entry.last_accessed = Instant::now();
            entry.data.clone()
        })
    }

    pub fn put(&mut self, session_id: &Uuid, data: SessionData) {
        let entry = Entry {
            data,
            last_accessed: Instant::now(),
        };
        self.sessions.insert(*session_id, entry);
    }

    /// Removes sessions idle for at least `ttl` and hands back their data.
    pub fn gc(&mut self, ttl: Duration) -> Vec<SessionData> {
        let now = Instant::now();
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_accessed) >= ttl)
            .map(|(id, _)| *id)
            .collect();

        expired
            .iter()
            .filter_map(|id| self.sessions.remove(id))
            .map(|entry| entry.data)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
