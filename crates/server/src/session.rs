use crate::chat::ChatService;
use crate::errors::ChatError;
use anyhow::{Context, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{debug, info, warn};
use pdfchat_core::config::SessionConfig;
use pdfchat_core::session::SessionStore;
use pdfchat_core::SessionData;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;
use vector_store::RedisSessionStore;

pub const SESSION_COOKIE: &str = "pdfchat_session";

const MEMORY_URL: &str = "memory://";

/// Where per-browser session data lives between requests.
pub enum SessionBackend {
    Memory {
        store: Mutex<SessionStore>,
        ttl: Duration,
    },
    Redis {
        store: RedisSessionStore,
        /// Serialises read-modify-write cycles per session within this process.
        locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    },
}

impl SessionBackend {
    pub fn in_memory(ttl: Duration) -> Self {
        SessionBackend::Memory {
            store: Mutex::new(SessionStore::new()),
            ttl,
        }
    }

    pub async fn from_config(config: &SessionConfig) -> Result<Self> {
        let ttl = Duration::from_secs(config.ttl_seconds);
        if config.url.starts_with(MEMORY_URL) {
            info!("Using in-memory session store");
            return Ok(Self::in_memory(ttl));
        }
        let store = RedisSessionStore::connect(&config.url, ttl)
            .await
            .context("Failed to create Redis session store")?;
        Ok(SessionBackend::Redis {
            store,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the stored data, or a fresh session when none exists. Reading
    /// an existing session restarts its idle timeout on either backend.
    pub async fn load(&self, session_id: &Uuid) -> Result<SessionData, ChatError> {
        let data = match self {
            SessionBackend::Memory { store, .. } => store.lock().await.get(session_id),
            SessionBackend::Redis { store, .. } => {
                let data = store.load(session_id).await.map_err(session_error)?;
                if data.is_some() {
                    store.extend_ttl(session_id).await.map_err(session_error)?;
                }
                data
            }
        };
        Ok(data.unwrap_or_default())
    }

    /// Applies `change` to the current session data and stores the result.
    /// Concurrent updates of one session run one after another, so none of
    /// them overwrites another's change with a stale copy.
    pub async fn update<T>(
        &self,
        session_id: &Uuid,
        change: impl FnOnce(&mut SessionData) -> T,
    ) -> Result<T, ChatError> {
        match self {
            SessionBackend::Memory { store, .. } => {
                let mut store = store.lock().await;
                let mut data = store.get(session_id).unwrap_or_default();
                let output = change(&mut data);
                store.put(session_id, data);
                Ok(output)
            }
            SessionBackend::Redis { store, locks } => {
                let lock = locks
                    .lock()
                    .await
                    .entry(*session_id)
                    .or_default()
                    .clone();
                let result = {
                    let _guard = lock.lock().await;
                    redis_update(store, session_id, change).await
                };
                drop(lock);

                let mut locks = locks.lock().await;
                if locks
                    .get(session_id)
                    .is_some_and(|lock| Arc::strong_count(lock) == 1)
                {
                    locks.remove(session_id);
                }
                result
            }
        }
    }

    /// Drops expired in-memory sessions and returns their data. Redis expires
    /// keys on its own.
    pub async fn gc(&self) -> Vec<SessionData> {
        match self {
            SessionBackend::Memory { store, ttl } => store.lock().await.gc(*ttl),
            SessionBackend::Redis { .. } => Vec::new(),
        }
    }

    /// Expires idle sessions and deletes the collections they owned.
    pub async fn gc_with_collections(&self, chat: &ChatService) -> usize {
        let expired = self.gc().await;
        for name in expired.iter().filter_map(|data| data.collection_name.as_deref()) {
            if let Err(e) = chat.drop_collection(name).await {
                warn!("Failed to drop collection {} of expired session: {}", name, e);
            }
        }
        expired.len()
    }

    pub fn spawn_gc(self: Arc<Self>, chat: Arc<ChatService>, every: Duration) {
        if matches!(*self, SessionBackend::Redis { .. }) {
            return;
        }
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = self.gc_with_collections(&chat).await;
                if removed > 0 {
                    debug!("Expired {} idle sessions", removed);
                }
            }
        });
    }
}

async fn redis_update<T>(
    store: &RedisSessionStore,
    session_id: &Uuid,
    change: impl FnOnce(&mut SessionData) -> T,
) -> Result<T, ChatError> {
    let mut data = store
        .load(session_id)
        .await
        .map_err(session_error)?
        .unwrap_or_default();
    let output = change(&mut data);
    store.save(session_id, &data).await.map_err(session_error)?;
    Ok(output)
}

fn session_error(e: anyhow::Error) -> ChatError {
    ChatError::Session(format!("{:#}", e))
}

/// Reads the session id from the cookie, minting a new one (and setting the
/// cookie) when it is missing or malformed.
pub fn session_id(jar: CookieJar) -> (Uuid, CookieJar) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        return (id, jar);
    }

    let id = Uuid::new_v4();
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (id, jar.add(cookie))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfchat_core::QaPair;

    #[tokio::test]
    async fn should_return_fresh_session_for_unknown_id() {
        let backend = SessionBackend::in_memory(Duration::from_secs(60));

        let data = backend.load(&Uuid::new_v4()).await.unwrap();

        assert!(data.collection_name.is_none());
        assert!(data.history.is_empty());
    }

    #[tokio::test]
    async fn should_persist_updated_session() {
        let backend = SessionBackend::in_memory(Duration::from_secs(60));
        let id = Uuid::new_v4();

        backend
            .update(&id, |data| {
                data.collection_name = Some("session_x".to_string());
                data.push_exchange(QaPair::new("q", "a"), 10);
            })
            .await
            .unwrap();

        let loaded = backend.load(&id).await.unwrap();
        assert_eq!(loaded.collection_name.as_deref(), Some("session_x"));
        assert_eq!(loaded.history, vec![QaPair::new("q", "a")]);
    }

    #[tokio::test]
    async fn should_keep_every_concurrent_update() {
        let backend = Arc::new(SessionBackend::in_memory(Duration::from_secs(60)));
        let id = Uuid::new_v4();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    backend
                        .update(&id, |data| {
                            data.push_exchange(QaPair::new(format!("q{}", i), "a"), 100)
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(backend.load(&id).await.unwrap().history.len(), 20);
    }

    #[tokio::test]
    async fn should_expire_idle_sessions() {
        let backend = SessionBackend::in_memory(Duration::ZERO);
        backend
            .update(&Uuid::new_v4(), |data| {
                data.collection_name = Some("session_old".to_string())
            })
            .await
            .unwrap();

        let expired = backend.gc().await;

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].collection_name.as_deref(), Some("session_old"));
    }

    #[tokio::test]
    async fn should_drop_collections_of_expired_sessions() {
        let chat = crate::chat::tests::service_with(Arc::new(
            crate::chat::tests::ScriptedModel::replying(&["ok"]),
        ));
        chat.index_documents(
            "session_old",
            vec![documents::SourceChunk::new("old.pdf", 0, "stale text")],
        )
        .await
        .unwrap();
        let backend = SessionBackend::in_memory(Duration::ZERO);
        backend
            .update(&Uuid::new_v4(), |data| {
                data.collection_name = Some("session_old".to_string())
            })
            .await
            .unwrap();

        assert_eq!(backend.gc_with_collections(&chat).await, 1);

        assert!(chat.list_files(Some("session_old")).await.unwrap().is_empty());
        assert!(!chat.drop_collection("session_old").await.unwrap());
    }

    #[tokio::test]
    async fn should_build_memory_backend_from_config() {
        let backend = SessionBackend::from_config(&SessionConfig::default())
            .await
            .unwrap();

        assert!(matches!(backend, SessionBackend::Memory { .. }));
    }

    #[test]
    fn should_mint_cookie_when_missing() {
        let (id, jar) = session_id(CookieJar::new());

        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn should_reuse_valid_cookie() {
        let existing = Uuid::new_v4();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, existing.to_string()));

        let (id, _) = session_id(jar);

        assert_eq!(id, existing);
    }

    #[test]
    fn should_replace_malformed_cookie() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not-a-uuid"));

        let (id, jar) = session_id(jar);

        assert_eq!(jar.get(SESSION_COOKIE).unwrap().value(), id.to_string());
    }
}
