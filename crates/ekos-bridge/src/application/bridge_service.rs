//! The bridge core: one dispatcher that turns channel and broker events into
//! broker publishes and channel broadcasts.
//!
//! Every connection event and every broker message is a [`BridgeEvent`] sent
//! over a single unbounded channel.  [`BridgeService::run`] consumes them in
//! order, so frames from one connection are published in the order Ekos sent
//! them, and the [`ConnectionRegistry`] is only ever touched by this task.
//!
//! ```text
//! channel session ──Frame──▶ ┌───────────────┐ ──publish──▶ broker
//! channel session ─Connected▶│ BridgeService │
//! mqtt event loop ─BusMsg──▶ └───────────────┘ ──broadcast─▶ channel sessions
//! ```

use std::sync::Arc;

use ekos_bridge_core::protocol::topic::target_channel;
use ekos_bridge_core::{decode_media_frame, Channel, Packet, Topic, TopicError};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::bus::{BusClient, BusError};
use crate::application::registry::{ConnectionId, ConnectionRegistry, Outbound, OutboundSender};

/// One application-level message received from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundFrame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            InboundFrame::Text(text) => text.as_bytes(),
            InboundFrame::Binary(bytes) => bytes,
        }
    }
}

/// Everything the dispatcher reacts to.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A channel handshake completed.
    Connected {
        channel: Channel,
        id: ConnectionId,
        outbound: OutboundSender,
    },
    /// Ekos sent a frame on an open connection.
    Frame {
        channel: Channel,
        id: ConnectionId,
        frame: InboundFrame,
    },
    /// A connection closed or failed.
    Disconnected { channel: Channel, id: ConnectionId },
    /// The broker delivered a message on a subscribed topic.
    BusMessage { topic: String, payload: Vec<u8> },
}

pub type EventSender = mpsc::UnboundedSender<BridgeEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BridgeEvent>;

/// Creates the channel every producer sends its events on.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Errors that prevent a packet from being published.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Owns the connection registry and the bus handle.
pub struct BridgeService {
    bus: Arc<dyn BusClient>,
    registry: ConnectionRegistry,
    debug: bool,
}

impl BridgeService {
    /// Creates a dispatcher.  With `debug` set, every publish and every
    /// broker message is mirrored to the log.
    pub fn new(bus: Arc<dyn BusClient>, debug: bool) -> Self {
        Self {
            bus,
            registry: ConnectionRegistry::new(),
            debug,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Processes events until every sender has been dropped.
    pub async fn run(mut self, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        debug!("event channel closed; dispatcher stopped");
    }

    /// Processes a single event.
    pub fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Connected {
                channel,
                id,
                outbound,
            } => {
                debug!("{channel} connection {id} registered");
                self.registry.insert(channel, id, outbound);
            }
            BridgeEvent::Frame { channel, id, frame } => self.on_frame(channel, id, &frame),
            BridgeEvent::Disconnected { channel, id } => self.on_disconnected(channel, id),
            BridgeEvent::BusMessage { topic, payload } => self.on_bus_message(&topic, &payload),
        }
    }

    /// Publishes `packet` on `bridge/<channel>/<packet.type>`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Topic`] if the packet type cannot form a topic
    /// and [`PublishError::Bus`] if the bus refused the request.
    pub fn publish_packet(&self, channel: Channel, packet: &Packet) -> Result<(), PublishError> {
        let topic = Topic::new(channel, &packet.kind)?;
        let body = packet.to_json();
        if self.debug {
            info!("publish {topic} {body}");
        }
        self.bus.publish(&topic, body)?;
        Ok(())
    }

    fn on_frame(&self, channel: Channel, id: ConnectionId, frame: &InboundFrame) {
        let packet = match channel {
            Channel::Message | Channel::Cloud => match Packet::from_slice(frame.as_bytes()) {
                Ok(packet) => packet,
                Err(e) => {
                    // A connection that sends non-packets is broken; close
                    // it and leave every other connection alone.
                    warn!("{channel} connection {id}: {e}; closing connection");
                    self.registry.send_to(
                        channel,
                        id,
                        Outbound::Close {
                            reason: "malformed packet".to_string(),
                        },
                    );
                    return;
                }
            },
            Channel::Media => match decode_media_frame(frame.as_bytes()) {
                Ok(media) => media.into_packet(),
                Err(e) => {
                    warn!("media connection {id}: dropping frame: {e}");
                    return;
                }
            },
        };

        if let Err(e) = self.publish_packet(channel, &packet) {
            warn!("{channel} connection {id}: packet {:?} not published: {e}", packet.kind);
        }
    }

    fn on_disconnected(&mut self, channel: Channel, id: ConnectionId) {
        if !self.registry.remove(channel, id) {
            debug!("{channel} connection {id} was not registered");
            return;
        }
        debug!("{channel} connection {id} removed");

        // Listeners must be able to observe the loss of the primary control
        // connection, so only the message channel announces its closure.
        if channel == Channel::Message {
            if let Err(e) = self.publish_packet(channel, &Packet::connection_lost()) {
                warn!("connection state change not published: {e}");
            }
        }
    }

    fn on_bus_message(&self, topic: &str, payload: &[u8]) {
        let channel = match target_channel(topic) {
            Ok(channel) => channel,
            Err(e) => {
                debug!("ignoring broker message: {e}");
                return;
            }
        };

        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("dropping broker message on {topic}: payload is not JSON: {e}");
                return;
            }
        };

        let text = value.to_string();
        if self.debug {
            info!("receive {topic} {text}");
        }

        let delivered = self.registry.broadcast(channel, &text);
        debug!("broker message on {topic} delivered to {delivered} {channel} connection(s)");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
