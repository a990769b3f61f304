//! The seam between the bridge and the MQTT broker.
//!
//! The infrastructure implementation wraps a `rumqttc` client; unit tests use
//! the generated `MockBusClient`, integration tests a recording double.

use async_trait::async_trait;
use ekos_bridge_core::Topic;
use thiserror::Error;

/// Errors returned by a [`BusClient`].
#[derive(Debug, Error)]
pub enum BusError {
    /// The client refused the request (queue full or client shut down).
    #[error("bus rejected request: {0}")]
    Request(String),
}

/// Publish side of the message bus.
///
/// `publish` only enqueues: it never waits for the broker, so the dispatcher
/// is never blocked by a slow or absent broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Enqueues `payload` for publication on `topic`.
    fn publish(&self, topic: &Topic, payload: String) -> Result<(), BusError>;

    /// Stops publishing and subscribing and ends the broker session.
    async fn disconnect(&self) -> Result<(), BusError>;
}
