//! Ordered teardown of the bridge.
//!
//! ```text
//! Running ──signal──▶ Draining ──drain done or timed out──▶ Stopped
//! ```
//!
//! Draining runs three independent steps in order without waiting on each
//! other: disconnect the bus, close the three channel listeners (which ends
//! every open session), then drain the HTTP listener within a fixed bound.
//! The bound matters: some Ekos builds never close their sockets, and without
//! it the process would never exit.

use std::future::Future;
use std::time::Duration;

use ekos_bridge_core::Channel;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::bus::BusClient;
use crate::domain::Signal;

/// One close switch per channel.
///
/// Sessions watch their channel's token and close when it is cancelled; the
/// accept loop refuses new upgrades for a closed channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelListeners {
    message: CancellationToken,
    media: CancellationToken,
    cloud: CancellationToken,
}

impl ChannelListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token sessions on `channel` watch.
    pub fn token(&self, channel: Channel) -> CancellationToken {
        self.get(channel).clone()
    }

    pub fn is_closed(&self, channel: Channel) -> bool {
        self.get(channel).is_cancelled()
    }

    /// Closes one listener and every session on it.
    pub fn close(&self, channel: Channel) {
        self.get(channel).cancel();
    }

    pub fn close_all(&self) {
        for channel in Channel::ALL {
            self.close(channel);
        }
    }

    fn get(&self, channel: Channel) -> &CancellationToken {
        match channel {
            Channel::Message => &self.message,
            Channel::Media => &self.media,
            Channel::Cloud => &self.cloud,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// Result of a completed shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOutcome {
    pub signal: Signal,
    /// `false` if the drain hit its timeout.
    pub drained: bool,
    /// `128 + signal value`.
    pub exit_code: i32,
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("shutdown already started (state: {0:?})")]
    AlreadyStarted(ShutdownState),
}

/// Drives the `Running → Draining → Stopped` state machine.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: ShutdownState,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            state: ShutdownState::Running,
            drain_timeout,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    /// Runs the shutdown sequence for `signal`.
    ///
    /// `drain` should stop accepting connections and resolve once in-flight
    /// connections are done.  It is abandoned after the drain timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::AlreadyStarted`] if called more than once.
    pub async fn shutdown<F>(
        &mut self,
        signal: Signal,
        bus: &dyn BusClient,
        listeners: &ChannelListeners,
        drain: F,
    ) -> Result<ShutdownOutcome, ShutdownError>
    where
        F: Future<Output = ()>,
    {
        if self.state != ShutdownState::Running {
            return Err(ShutdownError::AlreadyStarted(self.state));
        }
        self.state = ShutdownState::Draining;
        info!("shutting down on {signal}");

        if let Err(e) = bus.disconnect().await {
            warn!("bus disconnect failed: {e}");
        }

        listeners.close_all();

        let drained = tokio::time::timeout(self.drain_timeout, drain).await.is_ok();
        if !drained {
            warn!(
                "connections still open after {:?}; closing listener anyway",
                self.drain_timeout
            );
        }

        self.state = ShutdownState::Stopped;
        info!("server stopped by {signal} with value {}", signal.value());

        Ok(ShutdownOutcome {
            signal,
            drained,
            exit_code: signal.exit_code(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
