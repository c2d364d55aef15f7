pub mod connection;
pub mod events;
pub mod gate;
pub mod registry;
pub mod relay;
pub mod server;
