use anyhow::{Context, Result};
use pdfchat_core::SessionData;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use uuid::Uuid;

/// Session data kept in Redis as JSON under `session:<uuid>`. Every write
/// resets the key's TTL; readers slide it with [`RedisSessionStore::extend_ttl`].
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl: Duration,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Connected to Redis session store");
        Ok(Self { conn, ttl })
    }

    pub async fn load(&self, session_id: &Uuid) -> Result<Option<SessionData>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn
            .get(session_key(session_id))
            .await
            .context("Failed to get session from Redis")?;

        data.map(|json| {
            serde_json::from_str(&json).context("Failed to deserialize session data")
        })
        .transpose()
    }

    pub async fn save(&self, session_id: &Uuid, data: &SessionData) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(data).context("Failed to serialize session data")?;

        conn.set_ex::<_, _, ()>(session_key(session_id), json, self.ttl.as_secs())
            .await
            .context("Failed to store session in Redis")?;

        Ok(())
    }

    /// Restarts the key's TTL. Returns false when the session does not exist.
    pub async fn extend_ttl(&self, session_id: &Uuid) -> Result<bool> {
        let mut conn = self.conn.clone();
        let ttl = i64::try_from(self.ttl.as_secs()).context("Session TTL out of range")?;
        conn.expire(session_key(session_id), ttl)
            .await
            .context("Failed to extend session TTL")
    }
}

fn session_key(session_id: &Uuid) -> String {
    format!("session:{}", session_id)
}
