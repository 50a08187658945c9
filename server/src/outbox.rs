//! Delivery capability handed to a room for each bound occupant.
//!
//! Rooms never hold raw sockets; they hold an [`Outbox`] so the simulation
//! can be exercised in tests without any networking.

use shared::ServerMessage;
use tokio::sync::mpsc;

pub trait Outbox: Send + Sync {
    /// Delivers one event to the connection behind this outbox. Returns
    /// `false` when the connection is gone; callers log and move on.
    fn deliver(&self, event: &ServerMessage) -> bool;
}

/// Outbox over the per-connection channel that the websocket forwarder task
/// drains into the actual socket.
pub struct ChannelOutbox {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelOutbox {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        ChannelOutbox { tx }
    }
}

impl Outbox for ChannelOutbox {
    fn deliver(&self, event: &ServerMessage) -> bool {
        self.tx.send(event.clone()).is_ok()
    }
}

/// In-memory outbox that records everything delivered to it. Used by unit
/// and integration tests in place of a live connection.
#[derive(Default)]
pub struct RecordingOutbox {
    events: std::sync::Mutex<Vec<ServerMessage>>,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        RecordingOutbox::default()
    }

    pub fn events(&self) -> Vec<ServerMessage> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }
}

impl Outbox for RecordingOutbox {
    fn deliver(&self, event: &ServerMessage) -> bool {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_outbox_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outbox = ChannelOutbox::new(tx);

        assert!(outbox.deliver(&ServerMessage::GameStart));
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::GameStart);
    }

    #[test]
    fn test_channel_outbox_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let outbox = ChannelOutbox::new(tx);

        assert!(!outbox.deliver(&ServerMessage::GameStart));
    }

    #[test]
    fn test_recording_outbox_keeps_order() {
        let outbox = RecordingOutbox::new();
        outbox.deliver(&ServerMessage::GameStart);
        outbox.deliver(&ServerMessage::Error {
            reason: "x".to_string(),
        });

        let events = outbox.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ServerMessage::GameStart);
    }
}
