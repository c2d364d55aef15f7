//! Session lookup against the store shared with the HTTP layer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::db::kv::KeyValueStore;

use super::AuthError;

/// User identifier as written by the HTTP layer; numeric or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// The authenticated principal attached to an admitted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

/// Session payload as stored by the HTTP session middleware.
///
/// Only `userId` is required; everything else (cookie options etc.) is ignored.
#[derive(Debug, Deserialize)]
struct SessionRecord {
    #[serde(rename = "userId", default)]
    user_id: Option<UserId>,
}

/// Turns raw session keys into identities.
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    timeout: Duration,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            timeout,
        }
    }

    pub fn session_key(&self, raw_key: &str) -> String {
        format!("{}{}", self.key_prefix, raw_key)
    }

    /// Look up `raw_key` with a single bounded store read.
    ///
    /// `Ok(None)` means no such session (expired or never existed).
    pub async fn resolve(&self, raw_key: &str) -> Result<Option<Identity>, AuthError> {
        let key = self.session_key(raw_key);

        let value = match tokio::time::timeout(self.timeout, self.store.get(&key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session store lookup failed");
                return Err(AuthError::StoreUnavailable);
            }
            Err(_elapsed) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "session store lookup timed out");
                return Err(AuthError::StoreTimeout);
            }
        };

        let Some(value) = value else {
            return Ok(None);
        };

        let record: SessionRecord =
            serde_json::from_str(&value).map_err(|_| AuthError::CorruptSession)?;
        let user_id = record.user_id.ok_or(AuthError::CorruptSession)?;

        Ok(Some(Identity { user_id }))
    }
}
