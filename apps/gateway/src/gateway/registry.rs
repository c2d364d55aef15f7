//! Registry of admitted connections.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sandchat_common::ConnectionId;

use super::connection::Connection;

/// All connections that passed the gate and have not yet disconnected.
///
/// Uses `DashMap` for shard-level concurrency: admissions, disconnects, and
/// broadcasts from independent connection tasks never block one another for
/// longer than a single shard operation.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register an admitted connection. Returns `false` if the id was already taken,
    /// in which case the existing entry is left in place.
    pub fn add(&self, connection: Connection) -> bool {
        match self.connections.entry(connection.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(connection);
                true
            }
        }
    }

    /// Remove a connection on disconnect. Returns the entry if it was registered.
    pub fn remove(&self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id).map(|(_, conn)| conn)
    }

    /// Visit every registered connection except `except`.
    ///
    /// Shard read locks are held while `f` runs, so a concurrent `remove` of a
    /// visited entry waits until the visit is done. `f` must not call back into
    /// the registry.
    pub fn for_each_except<F>(&self, except: &ConnectionId, mut f: F)
    where
        F: FnMut(&Connection),
    {
        for entry in self.connections.iter() {
            if entry.key() != except {
                f(entry.value());
            }
        }
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
