use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config;
pub mod session;

/// One prior question and the answer the model gave to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Everything the server remembers about a browser session between requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub collection_name: Option<String>,
    #[serde(default)]
    pub history: Vec<QaPair>,
    #[serde(default)]
    pub vectordb_initialized: bool,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionData {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            collection_name: None,
            history: Vec::new(),
            vectordb_initialized: false,
            created_at: now,
            last_accessed: now,
        }
    }

    /// Appends an exchange, dropping the oldest ones once `max_history` is exceeded.
    /// A `max_history` of zero keeps everything.
    pub fn push_exchange(&mut self, pair: QaPair, max_history: usize) {
        self.history.push(pair);
        if max_history > 0 && self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
        self.last_accessed = Utc::now();
    }
}

/// Name of the vector collection owned by a session.
pub fn collection_name_for(session_id: &Uuid) -> String {
    format!("session_{}", session_id.simple())
}
