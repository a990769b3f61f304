//! Ekos WebSocket-to-MQTT bridge: entry point.
//!
//! Ekos connects to this process as if it were its web backend: it calls
//! `/api/authenticate`, then opens three WebSocket channels.  Every packet it
//! sends is published to the MQTT broker, and every message published on a
//! command topic is pushed back to the matching channel.
//!
//! # Usage
//!
//! ```text
//! ekos-bridge [OPTIONS]
//!
//! Options:
//!   --bind              <ADDR>  Listener bind address [default: 0.0.0.0]
//!   --port              <PORT>  Listener port [default: 3000]
//!   --broker-url        <URL>   MQTT broker [default: mqtt://127.0.0.1]
//!   --client-id         <ID>    MQTT client identifier [default: ekos-bridge]
//!   --debug                     Log every publish and broker message
//!   --drain-timeout-ms  <MS>    Shutdown drain bound [default: 1000]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                        | Default            |
//! |---------------------------------|--------------------|
//! | `EKOS_BRIDGE_BIND`              | `0.0.0.0`          |
//! | `EKOS_BRIDGE_PORT`              | `3000`             |
//! | `MQTT_BROKER_URL`               | `mqtt://127.0.0.1` |
//! | `EKOS_BRIDGE_CLIENT_ID`         | `ekos-bridge`      |
//! | `EKOS_WEB_DEBUG`                | unset (`1` = on)   |
//! | `EKOS_BRIDGE_DRAIN_TIMEOUT_MS`  | `1000`             |
//!
//! The process exits with `128 + signal value` after SIGHUP, SIGINT or
//! SIGTERM.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ekos_bridge::domain::config::{DEFAULT_BROKER_URL, DEFAULT_LISTEN_PORT};
use ekos_bridge::domain::{BridgeConfig, BrokerAddress};
use ekos_bridge::infrastructure::{wait_for_signal, Bridge};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WebSocket-to-MQTT bridge for Ekos.
#[derive(Debug, Parser)]
#[command(
    name = "ekos-bridge",
    about = "Bridges Ekos WebSocket channels to an MQTT broker",
    version
)]
struct Cli {
    /// IP address to bind the HTTP/WebSocket listener to.
    #[arg(long, default_value = "0.0.0.0", env = "EKOS_BRIDGE_BIND")]
    bind: String,

    /// TCP port of the HTTP/WebSocket listener.
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT, env = "EKOS_BRIDGE_PORT")]
    port: u16,

    /// MQTT broker URL (`mqtt://host[:port]`).
    #[arg(long, default_value = DEFAULT_BROKER_URL, env = "MQTT_BROKER_URL")]
    broker_url: String,

    /// MQTT client identifier.
    #[arg(long, default_value = "ekos-bridge", env = "EKOS_BRIDGE_CLIENT_ID")]
    client_id: String,

    /// Log every packet published to and received from the broker.
    ///
    /// `EKOS_WEB_DEBUG=1` enables it from the environment.
    #[arg(
        long,
        env = "EKOS_WEB_DEBUG",
        action = ArgAction::SetTrue,
        value_parser = parse_debug_flag
    )]
    debug: bool,

    /// Upper bound, in milliseconds, on waiting for open connections during
    /// shutdown.
    #[arg(long, default_value_t = 1000, env = "EKOS_BRIDGE_DRAIN_TIMEOUT_MS")]
    drain_timeout_ms: u64,
}

fn parse_debug_flag(value: &str) -> Result<bool, String> {
    Ok(matches!(value, "1" | "true"))
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or `--broker-url`
    /// cannot be parsed.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        let broker = BrokerAddress::parse(&self.broker_url)
            .with_context(|| format!("invalid broker URL: '{}'", self.broker_url))?;

        Ok(BridgeConfig {
            listen_addr: SocketAddr::new(ip, self.port),
            broker,
            client_id: self.client_id,
            debug: self.debug,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG wins; otherwise `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "ekos-bridge starting: listen={}, broker={}, debug={}",
        config.listen_addr, config.broker, config.debug
    );

    let bridge = Bridge::start(&config).await?;
    let signal = wait_for_signal().await?;
    let outcome = bridge.stop(signal).await?;

    std::process::exit(outcome.exit_code);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
