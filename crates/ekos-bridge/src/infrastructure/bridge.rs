//! The running bridge as one value.
//!
//! [`Bridge::start`] wires everything together: the HTTP/WebSocket listener,
//! the broker connection, the dispatcher task and the accept loop.
//! [`Bridge::stop`] tears it down again through the [`ShutdownCoordinator`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::application::{
    event_channel, BridgeService, BusClient, ChannelListeners, EventReceiver, EventSender,
    ShutdownCoordinator, ShutdownOutcome,
};
use crate::domain::{BridgeConfig, Signal};
use crate::infrastructure::mqtt_bus::MqttBus;
use crate::infrastructure::ws_server::{run_accept_loop, AcceptContext};

/// Owns every long-lived resource of a running bridge.
pub struct Bridge {
    local_addr: SocketAddr,
    bus: Arc<dyn BusClient>,
    listeners: ChannelListeners,
    accept_stop: CancellationToken,
    tracker: TaskTracker,
    dispatcher: JoinHandle<()>,
    coordinator: ShutdownCoordinator,
}

impl Bridge {
    /// Binds the listener, connects to the broker and starts serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.  An unreachable
    /// broker is not an error; the connection is retried in the background.
    pub async fn start(config: &BridgeConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;

        let (events, event_rx) = event_channel();
        let bus: Arc<dyn BusClient> = MqttBus::connect(config, events.clone());

        Self::start_with_bus(listener, bus, events, event_rx, config)
    }

    /// Starts serving on an already bound listener with any [`BusClient`].
    ///
    /// `events` and `event_rx` must be the two ends of the channel the bus
    /// delivers its messages on.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub fn start_with_bus(
        listener: TcpListener,
        bus: Arc<dyn BusClient>,
        events: EventSender,
        event_rx: EventReceiver,
        config: &BridgeConfig,
    ) -> anyhow::Result<Self> {
        let local_addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        let service = BridgeService::new(Arc::clone(&bus), config.debug);
        let dispatcher = tokio::spawn(service.run(event_rx));

        let listeners = ChannelListeners::new();
        let accept_stop = CancellationToken::new();
        let tracker = TaskTracker::new();
        let ctx = Arc::new(AcceptContext {
            events,
            listeners: listeners.clone(),
            tracker: tracker.clone(),
        });
        tracker.spawn(run_accept_loop(listener, ctx, accept_stop.clone()));

        info!("bridge listening on {local_addr}");

        Ok(Self {
            local_addr,
            bus,
            listeners,
            accept_stop,
            tracker,
            dispatcher,
            coordinator: ShutdownCoordinator::new(config.drain_timeout),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The per-channel listener switches; closing one refuses new upgrades
    /// on that channel and ends its open sessions.
    pub fn listeners(&self) -> &ChannelListeners {
        &self.listeners
    }

    /// Shuts the bridge down in response to `signal`.
    ///
    /// Resolves within the configured drain timeout even if some connection
    /// never closes.
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown was already started.
    pub async fn stop(mut self, signal: Signal) -> anyhow::Result<ShutdownOutcome> {
        let accept_stop = self.accept_stop.clone();
        let tracker = self.tracker.clone();
        let drain = async move {
            accept_stop.cancel();
            tracker.close();
            tracker.wait().await;
        };

        let outcome = self
            .coordinator
            .shutdown(signal, &*self.bus, &self.listeners, drain)
            .await?;

        self.dispatcher.abort();
        Ok(outcome)
    }
}
