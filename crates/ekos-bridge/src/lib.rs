//! ekos-bridge library crate.
//!
//! Bridges the Ekos observatory client, which speaks JSON packets over three
//! WebSocket channels, to an MQTT broker that other services listen on.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Ekos (/message/ekos, /media/ekos, /cloud/ekos)
//!         ↕
//! [ekos-bridge]
//!   ├── domain/             BridgeConfig, Signal
//!   ├── application/        Routing, dispatcher, registry, shutdown
//!   └── infrastructure/
//!         ├── ws_server/        Shared HTTP/WebSocket accept loop
//!         ├── channel_session/  One WebSocket connection (tokio-tungstenite)
//!         ├── mqtt_bus/         Broker connection (rumqttc)
//!         └── bridge/           Start/stop of the whole process
//!         ↕
//! MQTT broker (bridge/<channel>/<type>, bridge/commands/+/+)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `ekos-bridge-core`; it reaches the
//!   broker only through the [`application::BusClient`] trait.
//! - `infrastructure` depends on all other layers plus `tokio`, `rumqttc`
//!   and `tokio-tungstenite`.

/// Domain layer: configuration and signal types.
pub mod domain;

/// Application layer: request routing, event dispatch and shutdown.
pub mod application;

/// Infrastructure layer: sockets, broker client and process signals.
pub mod infrastructure;
