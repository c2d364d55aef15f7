use std::time::Duration;

/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection string for the shared session store.
    pub redis_url: String,
    /// Which session store backend to use.
    pub session_store: StoreBackend,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Name of the cookie set by the HTTP session middleware.
    pub session_cookie_name: String,
    /// Namespace prepended to the raw session key (e.g. `sess:`).
    pub session_key_prefix: String,
    /// Upper bound on a single session store lookup during admission.
    pub session_lookup_timeout: Duration,
    /// Secret shared with the HTTP session layer. When set, cookie signatures are verified.
    pub session_secret: Option<String>,
    /// Browser origin allowed to connect with credentials.
    pub cors_origin: Option<String>,
    /// Per-connection outbound queue depth before messages are dropped.
    pub outbound_queue_capacity: usize,
    /// How often a ping is sent to each connection.
    pub ping_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable has a default; malformed numeric values fall back to it.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
            session_store: match std::env::var("SESSION_STORE").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::Redis,
            },
            port: parsed_var("PORT").unwrap_or(4000),
            session_cookie_name: non_empty_var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "qid".to_string()),
            session_key_prefix: non_empty_var("SESSION_KEY_PREFIX")
                .unwrap_or_else(|| "sess:".to_string()),
            session_lookup_timeout: Duration::from_millis(
                parsed_var("SESSION_LOOKUP_TIMEOUT_MS").unwrap_or(250),
            ),
            session_secret: non_empty_var("SESSION_SECRET"),
            cors_origin: non_empty_var("CORS_ORIGIN"),
            outbound_queue_capacity: parsed_var("OUTBOUND_QUEUE_CAPACITY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(256),
            ping_interval: Duration::from_secs(
                parsed_var("PING_INTERVAL_SECS")
                    .filter(|n: &u64| *n > 0)
                    .unwrap_or(25),
            ),
        }
    }
}

impl Default for Config {
    /// Defaults used by tests and local development (in-memory store).
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            session_store: StoreBackend::Memory,
            port: 4000,
            session_cookie_name: "qid".to_string(),
            session_key_prefix: "sess:".to_string(),
            session_lookup_timeout: Duration::from_millis(250),
            session_secret: None,
            cors_origin: None,
            outbound_queue_capacity: 256,
            ping_interval: Duration::from_secs(25),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
