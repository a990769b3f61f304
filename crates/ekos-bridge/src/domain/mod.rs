//! Domain layer for ekos-bridge.
//!
//! Pure types with no I/O: runtime configuration and the set of signals that
//! end the process.  Packet, topic and channel types live in
//! `ekos-bridge-core` because they are shared with anything else that talks
//! to the broker.

pub mod config;
pub mod signal;

pub use config::{BridgeConfig, BrokerAddress, ConfigError};
pub use signal::Signal;
