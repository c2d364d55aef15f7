//! One-time admission check for incoming realtime connections.

use std::sync::Arc;

use crate::auth::{cookie, AuthError, Identity, SessionResolver, SignatureVerifier};
use crate::config::Config;
use crate::db::kv::KeyValueStore;

/// Decides, once per connection attempt, whether the caller holds a live session.
///
/// Admission is not re-checked afterwards: a session that expires in the store
/// does not close connections already admitted with it.
#[derive(Clone)]
pub struct ConnectionGate {
    cookie_name: String,
    verifier: Option<SignatureVerifier>,
    resolver: SessionResolver,
}

impl ConnectionGate {
    pub fn new(
        cookie_name: impl Into<String>,
        resolver: SessionResolver,
        verifier: Option<SignatureVerifier>,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            verifier,
            resolver,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        let resolver = SessionResolver::new(
            store,
            config.session_key_prefix.clone(),
            config.session_lookup_timeout,
        );
        let verifier = config.session_secret.as_deref().map(SignatureVerifier::new);
        Self::new(config.session_cookie_name.clone(), resolver, verifier)
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }

    /// Run the admission check against the attempt's `Cookie` header.
    ///
    /// The returned error is for diagnostics only; callers must surface a
    /// generic unauthorized response regardless of the variant.
    pub async fn admit(&self, cookie_header: Option<&str>) -> Result<Identity, AuthError> {
        match self.check(cookie_header).await {
            Ok(identity) => {
                tracing::info!(user_id = %identity.user_id, "connection admitted");
                Ok(identity)
            }
            Err(reason) => {
                tracing::debug!(%reason, "connection rejected");
                Err(reason)
            }
        }
    }

    async fn check(&self, cookie_header: Option<&str>) -> Result<Identity, AuthError> {
        let cookie = cookie::decode(cookie_header, &self.cookie_name)?;

        if let Some(verifier) = &self.verifier {
            verifier.verify(&cookie)?;
        }

        self.resolver
            .resolve(&cookie.raw_key)
            .await?
            .ok_or(AuthError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::UserId;
    use crate::db::kv::MemoryStore;

    fn gate(entries: &[(&str, &str)], secret: Option<&str>) -> ConnectionGate {
        let store = Arc::new(MemoryStore::with_entries(entries.iter().copied()));
        let resolver = SessionResolver::new(store, "sess:", Duration::from_millis(250));
        ConnectionGate::new("qid", resolver, secret.map(SignatureVerifier::new))
    }

    #[tokio::test]
    async fn admits_valid_session() {
        let gate = gate(&[("sess:abc123", r#"{"userId": 42}"#)], None);
        let identity = gate.admit(Some("qid=sig1.abc123")).await.unwrap();
        assert_eq!(identity.user_id, UserId::Number(42));
    }

    #[tokio::test]
    async fn rejects_unknown_session() {
        let gate = gate(&[], None);
        assert_eq!(gate.admit(Some("qid=sig1.zzz")).await, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_cookies() {
        let gate = gate(&[("sess:abc123", r#"{"userId": 42}"#)], None);
        assert_eq!(gate.admit(None).await, Err(AuthError::MissingCookie));
        assert_eq!(gate.admit(Some("other=sig1.abc123")).await, Err(AuthError::MissingCookie));
        assert_eq!(gate.admit(Some("qid=abc123")).await, Err(AuthError::MalformedCookie));
    }

    #[tokio::test]
    async fn rejects_corrupt_session() {
        let gate = gate(&[("sess:abc123", r#"{"user":42}"#)], None);
        assert_eq!(gate.admit(Some("qid=sig1.abc123")).await, Err(AuthError::CorruptSession));
    }

    #[tokio::test]
    async fn verifies_signature_when_secret_configured() {
        let gate = gate(&[("sess:abc123", r#"{"userId": 42}"#)], Some("dev_session_secret"));
        assert!(gate.verifies_signatures());

        assert_eq!(gate.admit(Some("qid=sig1.abc123")).await, Err(AuthError::BadSignature));

        let sig = SignatureVerifier::new("dev_session_secret").sign("abc123");
        let header = format!("qid=s:{sig}.abc123");
        let identity = gate.admit(Some(&header)).await.unwrap();
        assert_eq!(identity.user_id, UserId::Number(42));
    }

    #[test]
    fn from_config_uses_configured_names() {
        let config = Config {
            session_secret: Some("x".to_string()),
            ..Config::default()
        };
        let gate = ConnectionGate::from_config(&config, Arc::new(MemoryStore::new()));
        assert!(gate.verifies_signatures());
        assert_eq!(gate.cookie_name, "qid");
    }
}
