use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Failure talking to the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the key-value store shared with the HTTP session layer.
///
/// Backed by Redis in production and an in-memory map in tests. The gateway
/// never writes session records; the HTTP layer owns them and their TTLs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        use redis::AsyncCommands;
        // ConnectionManager is a cheap handle over one multiplexed connection.
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(|e| {
            tracing::error!(?e, "redis get failed");
            StoreError::Unavailable(e.to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests / local development)
// ---------------------------------------------------------------------------

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

pub struct MemoryStore {
    data: DashMap<String, MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Seed the store from `(key, value)` pairs without expiry.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (k, v) in entries {
            store.set(k, v);
        }
        store
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(
            key.into(),
            MemoryEntry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    pub fn set_ex(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        self.data.insert(
            key.into(),
            MemoryEntry {
                value: value.into(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.data.remove(key);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.data.get(key) {
            if entry.expires_at.map_or(true, |at| at > now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.data
            .remove_if(key, |_, e| e.expires_at.is_some_and(|at| at <= now));
        Ok(None)
    }
}
