//! MQTT side of the bridge, built on `rumqttc`.
//!
//! `rumqttc` splits a connection into a cloneable [`AsyncClient`] that queues
//! requests and an [`EventLoop`] that must be polled to do any network I/O.
//! [`MqttBus`] owns the client; a driver task owns the event loop and turns
//! incoming publishes into [`BridgeEvent::BusMessage`] events.
//!
//! # Reconnect policy
//!
//! A failed poll means the broker connection is gone.  Unless the bridge is
//! stopping, the driver waits [`RECONNECT_DELAY`] and polls again, which makes
//! `rumqttc` reconnect.  Publishes made meanwhile wait in the request queue;
//! once [`REQUEST_QUEUE_CAPACITY`] is reached they are rejected and the
//! dispatcher logs them as dropped.  The command subscription is renewed on
//! every successful (re)connect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ekos_bridge_core::{Topic, COMMAND_SUBSCRIPTION};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet as MqttPacket, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{BridgeEvent, BusClient, BusError, EventSender};
use crate::domain::BridgeConfig;

/// Requests that can wait in the client queue while the broker is away.
pub const REQUEST_QUEUE_CAPACITY: usize = 1024;

/// Pause between reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Live MQTT connection used as the bridge's [`BusClient`].
pub struct MqttBus {
    client: AsyncClient,
    stop: CancellationToken,
}

impl MqttBus {
    /// Creates the client and spawns its driver task.
    ///
    /// Returns immediately; the broker connection is established in the
    /// background and retried until [`BusClient::disconnect`] is called.
    pub fn connect(config: &BridgeConfig, events: EventSender) -> Arc<Self> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker.host.clone(),
            config.broker.port,
        );
        options.set_keep_alive(KEEP_ALIVE);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let stop = CancellationToken::new();

        info!("connecting to broker {}", config.broker);
        tokio::spawn(drive(eventloop, client.clone(), events, stop.clone()));

        Arc::new(Self { client, stop })
    }
}

#[async_trait]
impl BusClient for MqttBus {
    fn publish(&self, topic: &Topic, payload: String) -> Result<(), BusError> {
        self.client
            .try_publish(topic.to_string(), QoS::AtMostOnce, false, payload.into_bytes())
            .map_err(|e| BusError::Request(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.stop.cancel();
        self.client
            .try_disconnect()
            .map_err(|e| BusError::Request(e.to_string()))
    }
}

async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    events: EventSender,
    stop: CancellationToken,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(MqttPacket::ConnAck(_))) => {
                info!("connected to broker; subscribing to {COMMAND_SUBSCRIPTION}");
                if let Err(e) = client.try_subscribe(COMMAND_SUBSCRIPTION, QoS::AtMostOnce) {
                    warn!("subscribe to {COMMAND_SUBSCRIPTION} failed: {e}");
                }
            }
            Ok(Event::Incoming(MqttPacket::Publish(publish))) => {
                let event = BridgeEvent::BusMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                };
                if events.send(event).is_err() {
                    debug!("dispatcher gone; stopping broker driver");
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("disconnected from broker");
                break;
            }
            Ok(_) => {}
            Err(e) if stop.is_cancelled() => {
                debug!("broker driver stopping after error: {e}");
                break;
            }
            Err(e) => {
                warn!("broker connection error: {e}; retrying in {RECONNECT_DELAY:?}");
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }
}
