//! Fan-out of client messages to every other admitted connection.

use std::sync::Arc;

use sandchat_common::ConnectionId;

use super::connection::SendFailure;
use super::events::ChatMessage;
use super::registry::ConnectionRegistry;

/// Outcome of one fan-out, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Relays each message to all registered connections except its sender.
///
/// Delivery is best-effort. Recipients whose queue is closed or full lose the
/// message; nobody else is affected and the sender is never told.
#[derive(Clone)]
pub struct BroadcastRelay {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn on_message(&self, sender: &ConnectionId, message: &ChatMessage) -> RelayReport {
        let frame = message.frame();
        let mut report = RelayReport::default();

        self.registry.for_each_except(sender, |recipient| {
            match recipient.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    report.dropped += 1;
                    match failure {
                        SendFailure::Full => tracing::warn!(
                            connection_id = %recipient.id,
                            "outbound queue full, dropping message"
                        ),
                        SendFailure::Closed => tracing::debug!(
                            connection_id = %recipient.id,
                            "recipient closed, dropping message"
                        ),
                    }
                }
            }
        });

        report
    }
}
