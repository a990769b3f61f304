//! Application layer for ekos-bridge.
//!
//! The application layer knows *what* the bridge does with every event but
//! not *how* bytes reach a socket or the broker.
//!
//! # Responsibilities
//!
//! - Routing HTTP requests to the authenticate response or a channel
//! - Tracking the open connections of each channel
//! - Translating channel frames into broker publishes and broker messages
//!   into channel broadcasts
//! - Sequencing shutdown
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or the MQTT connection (that is infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite)

pub mod bridge_service;
pub mod bus;
pub mod registry;
pub mod router;
pub mod shutdown;

pub use bridge_service::{event_channel, BridgeEvent, BridgeService, EventReceiver, EventSender, InboundFrame, PublishError};
pub use bus::{BusClient, BusError};
pub use registry::{
    outbound_queue, ConnectionId, ConnectionRegistry, Outbound, OutboundReceiver, OutboundSender,
};
pub use router::{route_request, AuthenticateResponse, Route};
pub use shutdown::{ChannelListeners, ShutdownCoordinator, ShutdownError, ShutdownOutcome, ShutdownState};
