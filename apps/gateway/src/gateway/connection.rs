//! Per-connection handle held by the registry.

use axum::extract::ws::Utf8Bytes;
use sandchat_common::ConnectionId;
use tokio::sync::mpsc;

use crate::auth::Identity;

/// A text frame queued for delivery to one connection.
pub type Outbound = Utf8Bytes;

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The connection's task has stopped reading its queue.
    Closed,
    /// The queue is at capacity; the frame was dropped.
    Full,
}

/// An admitted connection as seen by everyone except its own task.
///
/// Holds the sending half of the connection's outbound queue, never the socket.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    tx: mpsc::Sender<Outbound>,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Identity, tx: mpsc::Sender<Outbound>) -> Self {
        Self { id, identity, tx }
    }

    /// Create a connection together with the receiving half of its outbound queue.
    pub fn channel(
        id: ConnectionId,
        identity: Identity,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(id, identity, tx), rx)
    }

    /// Queue a frame without waiting.
    pub fn try_send(&self, frame: Outbound) -> Result<(), SendFailure> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::Full,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}
