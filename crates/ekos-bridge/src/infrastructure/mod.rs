//! Infrastructure layer for ekos-bridge.
//!
//! Everything that touches a socket or the process lives here: the shared
//! HTTP/WebSocket listener, channel sessions, the MQTT client and signal
//! handling.  Decisions about what to do with a request or a packet are made
//! in the application layer.

pub mod bridge;
pub mod channel_session;
pub mod http;
pub mod mqtt_bus;
pub mod signals;
pub mod ws_server;

pub use bridge::Bridge;
pub use mqtt_bus::MqttBus;
pub use signals::wait_for_signal;
