pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::kv::KeyValueStore;
use gateway::gate::ConnectionGate;
use gateway::registry::ConnectionRegistry;
use gateway::relay::BroadcastRelay;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: ConnectionGate,
    pub registry: Arc<ConnectionRegistry>,
    pub relay: BroadcastRelay,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let gate = ConnectionGate::from_config(&config, store);
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = BroadcastRelay::new(registry.clone());
        Self {
            config: Arc::new(config),
            gate,
            registry,
            relay,
        }
    }
}
