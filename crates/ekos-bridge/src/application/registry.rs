//! Per-channel sets of open connections.
//!
//! Each open WebSocket session is represented by the sending half of its
//! outbound queue.  The registry is owned by the single dispatcher task, so
//! broadcast and connect/disconnect never race and no lock is needed.

use std::collections::HashMap;
use std::fmt;

use ekos_bridge_core::Channel;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;
use uuid::Uuid;

/// Frames that may wait for one connection's writer.  A client that stops
/// reading loses broadcasts beyond this instead of growing the queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Identifies one WebSocket session for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instructions for a session's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send a text frame.
    Text(String),
    /// Close the connection because Ekos sent something unusable.
    Close { reason: String },
}

pub type OutboundSender = mpsc::Sender<Outbound>;
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// Creates the outbound queue of one connection.
pub fn outbound_queue() -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// The open connections of every channel.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sets: HashMap<Channel, HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to its channel's set.
    pub fn insert(&mut self, channel: Channel, id: ConnectionId, outbound: OutboundSender) {
        self.sets.entry(channel).or_default().insert(id, outbound);
    }

    /// Removes a connection.  Returns `false` if it was not registered.
    pub fn remove(&mut self, channel: Channel, id: ConnectionId) -> bool {
        self.sets
            .get_mut(&channel)
            .is_some_and(|set| set.remove(&id).is_some())
    }

    pub fn contains(&self, channel: Channel, id: ConnectionId) -> bool {
        self.sets
            .get(&channel)
            .is_some_and(|set| set.contains_key(&id))
    }

    /// Number of open connections on `channel`.
    pub fn len(&self, channel: Channel) -> usize {
        self.sets.get(&channel).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.values().all(HashMap::is_empty)
    }

    /// Sends one instruction to a single connection.
    ///
    /// Returns `false` if the connection is unknown, its writer is gone or
    /// its queue is full.
    pub fn send_to(&self, channel: Channel, id: ConnectionId, outbound: Outbound) -> bool {
        self.sets
            .get(&channel)
            .and_then(|set| set.get(&id))
            .is_some_and(|tx| queue(channel, id, tx, outbound))
    }

    /// Queues `text` on every connection of `channel`.
    ///
    /// Returns how many connections accepted the frame.  A connection whose
    /// writer has already gone is skipped; its `Disconnected` event removes
    /// it shortly after.  A connection whose queue is full misses the frame.
    pub fn broadcast(&self, channel: Channel, text: &str) -> usize {
        let Some(set) = self.sets.get(&channel) else {
            return 0;
        };
        set.iter()
            .filter(|(id, tx)| queue(channel, **id, tx, Outbound::Text(text.to_string())))
            .count()
    }
}

fn queue(channel: Channel, id: ConnectionId, tx: &OutboundSender, outbound: Outbound) -> bool {
    match tx.try_send(outbound) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("{channel} connection {id}: outbound queue full; frame dropped");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(
        registry: &mut ConnectionRegistry,
        channel: Channel,
    ) -> (ConnectionId, OutboundReceiver) {
        let (tx, rx) = outbound_queue();
        let id = ConnectionId::new();
        registry.insert(channel, id, tx);
        (id, rx)
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(Channel::Message), 0);
    }

    #[test]
    fn test_insert_and_remove() {
        // Arrange
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = connect(&mut registry, Channel::Media);

        // Act / Assert
        assert!(registry.contains(Channel::Media, id));
        assert!(registry.remove(Channel::Media, id));
        assert!(!registry.contains(Channel::Media, id));
        assert!(!registry.remove(Channel::Media, id), "second remove must report absence");
    }

    #[test]
    fn test_remove_on_wrong_channel_is_noop() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = connect(&mut registry, Channel::Cloud);
        assert!(!registry.remove(Channel::Message, id));
        assert_eq!(registry.len(Channel::Cloud), 1);
    }

    #[test]
    fn test_broadcast_reaches_only_the_target_channel() {
        // Arrange
        let mut registry = ConnectionRegistry::new();
        let (_, mut msg_a) = connect(&mut registry, Channel::Message);
        let (_, mut msg_b) = connect(&mut registry, Channel::Message);
        let (_, mut media) = connect(&mut registry, Channel::Media);

        // Act
        let delivered = registry.broadcast(Channel::Message, "{}");

        // Assert
        assert_eq!(delivered, 2);
        assert_eq!(msg_a.try_recv(), Ok(Outbound::Text("{}".to_string())));
        assert_eq!(msg_b.try_recv(), Ok(Outbound::Text("{}".to_string())));
        assert!(media.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_skips_closed_writers() {
        let mut registry = ConnectionRegistry::new();
        let (_, rx) = connect(&mut registry, Channel::Cloud);
        drop(rx);
        let (_, _live) = connect(&mut registry, Channel::Cloud);

        assert_eq!(registry.broadcast(Channel::Cloud, "x"), 1);
    }

    #[test]
    fn test_broadcast_drops_frames_for_a_client_that_stops_reading() {
        // Arrange: one connection never drains its queue.
        let mut registry = ConnectionRegistry::new();
        let (_, mut stalled) = connect(&mut registry, Channel::Message);
        let (_, mut reading) = connect(&mut registry, Channel::Message);

        // Act
        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            assert_eq!(registry.broadcast(Channel::Message, "x"), 2);
            assert!(reading.try_recv().is_ok());
        }
        let delivered = registry.broadcast(Channel::Message, "overflow");

        // Assert: only the reading connection got the extra frame.
        assert_eq!(delivered, 1);
        assert_eq!(reading.try_recv(), Ok(Outbound::Text("overflow".to_string())));
        let mut queued = 0;
        while stalled.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_QUEUE_CAPACITY);
    }

    #[test]
    fn test_broadcast_on_empty_channel_delivers_nothing() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.broadcast(Channel::Media, "x"), 0);
    }

    #[test]
    fn test_send_to_single_connection() {
        let mut registry = ConnectionRegistry::new();
        let (id, mut rx) = connect(&mut registry, Channel::Message);
        let (_, mut other) = connect(&mut registry, Channel::Message);

        let close = Outbound::Close {
            reason: "bad".to_string(),
        };
        assert!(registry.send_to(Channel::Message, id, close.clone()));
        assert_eq!(rx.try_recv(), Ok(close));
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
